// crates/concord-node/src/lib.rs
//
// Concord node: block finalizer, runtime configuration, and the simulated
// capabilities used by the `concord-sim` binary.

pub mod app;
pub mod config;
pub mod sim;

pub use app::{App, BlockOutcome, Capabilities, Msg, MsgResponse};
pub use config::{NodeConfig, SimulationConfig, ValidatorConfig};
pub use sim::{SimBank, SimMarket, SimReport, SimStaking, SimTreasury, Simulator};
