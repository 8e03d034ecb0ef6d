// crates/concord-economics/src/lib.rs
//
// concord-economics: claim pools, reward funding, and epoch reward
// distribution for Concord.
//
// All amounts are integers in the smallest unit of their denom; every
// division truncates, so a distribution never pays out more than it holds.

pub mod claims;
pub mod distributor;
pub mod funding;

// Re-export key types for ergonomic access from downstream crates.
pub use claims::{Claim, ClaimPool, BUDGET_NAMESPACE, ORACLE_NAMESPACE};
pub use distributor::{DistributionOutcome, Payout, RewardDistributor};
pub use funding::{denominate, fee_pool_rewards, seigniorage_reward};
