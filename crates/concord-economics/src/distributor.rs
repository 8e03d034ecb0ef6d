// crates/concord-economics/src/distributor.rs
//
// Epoch reward distribution.
//
// For every reward coin, each claim is paid
//   payout = floor(amount * weight / weight_sum)
// in recipient key order. Truncation means the sum of payouts never exceeds
// the amount; the remainder (at most `recipients - 1` units per coin) stays
// undistributed. The pool is cleared afterwards no matter what, so weight
// never carries over into the next epoch.

use serde::{Deserialize, Serialize};

use concord_core::coin::Coin;
use concord_core::error::ConcordError;
use concord_core::identity::AccountId;
use concord_core::math::mul_div_floor;
use concord_core::traits::MintSink;
use concord_store::KvStore;

use crate::claims::ClaimPool;

/// A single minted (or attempted) payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: AccountId,
    pub coin: Coin,
}

/// What one distribution pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionOutcome {
    pub epoch: u64,
    /// Reward coins offered to the pool.
    pub rewards: Vec<Coin>,
    /// Sum of claim weights at distribution time.
    pub weight_sum: u128,
    /// Number of claims cleared from the pool.
    pub recipients: usize,
    /// Payouts that were minted.
    pub payouts: Vec<Payout>,
    /// Payouts the mint sink refused.
    pub failed: Vec<Payout>,
    /// Per reward coin, the amount left undistributed.
    pub dust: Vec<Coin>,
}

impl DistributionOutcome {
    /// Total successfully minted in `denom`.
    pub fn distributed(&self, denom: &str) -> u128 {
        self.payouts
            .iter()
            .filter(|p| p.coin.denom == denom)
            .map(|p| p.coin.amount)
            .sum()
    }
}

/// Pays out claim pools through a `MintSink`.
pub struct RewardDistributor<'a> {
    mint: &'a dyn MintSink,
}

impl<'a> RewardDistributor<'a> {
    pub fn new(mint: &'a dyn MintSink) -> Self {
        Self { mint }
    }

    /// Distribute `rewards` over `pool` and clear it.
    ///
    /// Mint failures are logged and recorded in the outcome; only a failure
    /// of the underlying store is returned as an error.
    pub fn distribute(
        &self,
        store: &mut dyn KvStore,
        pool: &ClaimPool,
        epoch: u64,
        rewards: &[Coin],
    ) -> Result<DistributionOutcome, ConcordError> {
        self.distribute_with(store, pool, epoch, || rewards.to_vec())
    }

    /// Like `distribute`, but the rewards are only produced once the pool
    /// has been read. Use this when producing them has a side effect, such
    /// as draining a fee pool, that must not happen if the read fails.
    pub fn distribute_with(
        &self,
        store: &mut dyn KvStore,
        pool: &ClaimPool,
        epoch: u64,
        fund: impl FnOnce() -> Vec<Coin>,
    ) -> Result<DistributionOutcome, ConcordError> {
        let claims = pool.claims(store)?;
        let rewards = fund();
        let rewards = rewards.as_slice();
        let weight_sum = claims
            .iter()
            .fold(0u128, |acc, c| acc.saturating_add(c.weight));

        let mut outcome = DistributionOutcome {
            epoch,
            rewards: rewards.to_vec(),
            weight_sum,
            recipients: claims.len(),
            ..DistributionOutcome::default()
        };

        for reward in rewards {
            if reward.is_zero() {
                continue;
            }
            if weight_sum == 0 {
                outcome.dust.push(reward.clone());
                continue;
            }

            let mut distributed: u128 = 0;
            for claim in &claims {
                let amount = mul_div_floor(reward.amount, claim.weight, weight_sum).unwrap_or(0);
                if amount == 0 {
                    continue;
                }
                let payout = Payout {
                    recipient: claim.recipient,
                    coin: Coin::new(reward.denom.clone(), amount),
                };
                match self.mint.mint(&payout.recipient, &payout.coin) {
                    Ok(()) => {
                        distributed += amount;
                        outcome.payouts.push(payout);
                    }
                    Err(e) => {
                        tracing::warn!(
                            epoch,
                            recipient = %payout.recipient,
                            coin = %payout.coin,
                            "reward mint failed: {}",
                            e
                        );
                        outcome.failed.push(payout);
                    }
                }
            }

            outcome
                .dust
                .push(Coin::new(reward.denom.clone(), reward.amount - distributed));
        }

        pool.clear(store)?;

        tracing::info!(
            epoch,
            namespace = pool.namespace(),
            recipients = outcome.recipients,
            payouts = outcome.payouts.len(),
            failed = outcome.failed.len(),
            "epoch rewards distributed"
        );
        Ok(outcome)
    }
}
