// crates/concord-budget/src/lib.rs
//
// concord-budget: stake-weighted governance over budget programs.
//
// Programs are proposed as candidates, voted on by validators with their
// bonded stake, activated or rejected when their voting window closes, and
// re-weighted every budget vote period. Active programs earn budget claims
// for their executors, paid from seigniorage at the end of each epoch.

pub mod keeper;
pub mod program;
pub mod store;
pub mod tally;

pub use keeper::{BudgetKeeper, GovernancePassOutcome, ProgramAction, ProgramEvent};
pub use program::{GovernanceVote, Program, ProgramStatus, VoteOption};
pub use store::ProgramStore;
pub use tally::{tally, Tally};
