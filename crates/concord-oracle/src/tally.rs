// crates/concord-oracle/src/tally.rs
//
// The end-of-period price pass.
//
// Runs on the last block of every oracle vote period:
//
//   1. Denoms holding a rate but without a single vote this period lose
//      their rate.
//   2. Each denom's votes become a ballot weighted by the voters' stake as
//      read right now. Voters that are no longer validators are dropped.
//   3. If the ballot power reaches `vote_threshold * total_bonded` the
//      weighted median becomes the new rate and every voter within
//      `median ± reward_band / 2` earns an oracle claim equal to its stake.
//      Otherwise the rate is deleted and nobody earns anything.
//   4. All votes are deleted, stale or not.

use serde::{Deserialize, Serialize};

use concord_core::error::ConcordError;
use concord_core::identity::AccountId;
use concord_core::math::clears_threshold;
use concord_core::params::OracleParams;
use concord_core::period::period_of;
use concord_core::traits::ValidatorWeightSource;
use concord_core::Decimal;
use concord_economics::{Claim, ClaimPool};
use concord_store::KvStore;

use crate::ballot::{Ballot, BallotEntry};
use crate::rates::{active_denoms, delete_exchange_rate, set_exchange_rate};
use crate::reveal::{RevealStore, Vote};

/// What happened to one denom's rate in a price pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateDecision {
    /// The weighted median was written as the new rate.
    Accepted { rate: Decimal },
    /// Votes were cast but their power did not reach the threshold.
    Rejected,
    /// No votes were cast; the previous rate was removed.
    Cleared,
}

/// Per-denom result of a price pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomTally {
    pub denom: String,
    pub decision: RateDecision,
    /// Stake behind the counted votes.
    pub ballot_power: u128,
    /// Votes counted.
    pub votes: usize,
    /// Votes dropped because the voter is no longer a validator.
    pub stale: usize,
    /// Claims added to the oracle pool.
    pub winners: Vec<Claim>,
}

/// Result of one price pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePassOutcome {
    pub height: u64,
    pub period: u64,
    pub total_bonded: u128,
    pub denoms: Vec<DenomTally>,
    pub votes_cleared: usize,
}

impl PricePassOutcome {
    pub fn decision(&self, denom: &str) -> Option<&RateDecision> {
        self.denoms
            .iter()
            .find(|d| d.denom == denom)
            .map(|d| &d.decision)
    }
}

/// Drives the price pass against a validator weight source.
pub struct PriceTally<'a> {
    weights: &'a dyn ValidatorWeightSource,
}

impl<'a> PriceTally<'a> {
    pub fn new(weights: &'a dyn ValidatorWeightSource) -> Self {
        Self { weights }
    }

    pub fn run(
        &self,
        store: &mut dyn KvStore,
        params: &OracleParams,
        height: u64,
    ) -> Result<PricePassOutcome, ConcordError> {
        let grouped = RevealStore::grouped(store)?;
        let total_bonded = self.weights.total_bonded_stake();

        let mut outcome = PricePassOutcome {
            height,
            period: period_of(height, params.vote_period),
            total_bonded,
            ..PricePassOutcome::default()
        };

        for denom in active_denoms(store)? {
            if grouped.contains_key(&denom) {
                continue;
            }
            delete_exchange_rate(store, &denom)?;
            tracing::info!(denom = %denom, height, "no votes this period, rate cleared");
            outcome.denoms.push(DenomTally {
                denom,
                decision: RateDecision::Cleared,
                ballot_power: 0,
                votes: 0,
                stale: 0,
                winners: Vec::new(),
            });
        }

        let pool = ClaimPool::oracle();
        for (denom, votes) in &grouped {
            let (ballot, stale) = self.build_ballot(votes);
            let power = ballot.power();
            let mut tally = DenomTally {
                denom: denom.clone(),
                decision: RateDecision::Rejected,
                ballot_power: power,
                votes: ballot.len(),
                stale,
                winners: Vec::new(),
            };

            let clears = power > 0
                && clears_threshold(
                    i128::try_from(power).unwrap_or(i128::MAX),
                    total_bonded,
                    params.vote_threshold,
                );
            match ballot.weighted_median().filter(|_| clears) {
                Some(median) => {
                    set_exchange_rate(store, denom, median)?;
                    for winner in ballot.winners(median, params.reward_band) {
                        let recipient: AccountId = self.weights.reward_recipient(&winner.voter);
                        pool.add(store, &recipient, winner.weight)?;
                        if winner.weight > 0 {
                            tally.winners.push(Claim::new(recipient, winner.weight));
                        }
                    }
                    tracing::info!(
                        denom = %denom,
                        rate = %median,
                        ballot_power = power,
                        winners = tally.winners.len(),
                        "exchange rate accepted"
                    );
                    tally.decision = RateDecision::Accepted { rate: median };
                }
                None => {
                    delete_exchange_rate(store, denom)?;
                    tracing::info!(
                        denom = %denom,
                        ballot_power = power,
                        total_bonded,
                        threshold = %params.vote_threshold,
                        "ballot below vote threshold, rate deleted"
                    );
                }
            }
            outcome.denoms.push(tally);
        }

        outcome.votes_cleared = RevealStore::clear(store)?;
        tracing::debug!(height, votes_cleared = outcome.votes_cleared, "price pass complete");
        Ok(outcome)
    }

    /// Weight each vote by the voter's current stake. Returns the ballot and
    /// the number of stale votes dropped.
    fn build_ballot(&self, votes: &[Vote]) -> (Ballot, usize) {
        let mut entries = Vec::with_capacity(votes.len());
        let mut stale = 0;
        for vote in votes {
            match self.weights.stake_of(&vote.voter) {
                Some(weight) => {
                    tracing::trace!(denom = %vote.denom, voter = %vote.voter, price = %vote.price, weight, "counted vote");
                    entries.push(BallotEntry {
                        voter: vote.voter,
                        price: vote.price,
                        weight,
                    });
                }
                None => {
                    tracing::warn!(denom = %vote.denom, voter = %vote.voter, "dropping vote from non-validator");
                    stale += 1;
                }
            }
        }
        (Ballot::new(entries), stale)
    }
}
