// crates/concord-core/src/lib.rs
//
// concord-core: Core types, keys, params, and capability traits for the
// Concord stake-weighted tally and reward engine.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines identities, integer amounts, exact ratio arithmetic, the vote
// commitment hash, the persisted key layout, module parameters, and the
// capability traits through which the engine reads stake and pays rewards.

pub mod coin;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod keys;
pub mod math;
pub mod params;
pub mod period;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use concord_core::ValidatorId;`

pub use coin::{Amount, Coin};
pub use crypto::{vote_hash, VoteHash};
pub use error::ConcordError;
pub use identity::{AccountId, ValidatorId};
pub use params::{BudgetParams, OracleParams, RewardParams};
pub use period::{epoch_of, is_period_last_block, period_of};
pub use traits::{FeeCollector, MintSink, SeigniorageSource, SwapRateSource, ValidatorWeightSource};

pub use rust_decimal::Decimal;
