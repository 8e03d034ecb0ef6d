// crates/concord-budget/src/tally.rs
//
// Net-stake tally of a program's governance votes.
//
// Yes votes add the voter's bonded stake, no votes subtract it. Stake is
// read at tally time; a voter that is no longer a validator has its vote
// deleted instead of counted, and so does a vote record that fails to
// decode. Deletions are collected during the scan and applied after it.

use concord_core::error::ConcordError;
use concord_core::identity::{AccountId, ValidatorId};
use concord_core::traits::ValidatorWeightSource;
use concord_store::KvStore;

use crate::program::VoteOption;
use crate::store::ProgramStore;

/// Result of tallying one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Σ yes stake − Σ no stake.
    pub vote_power: i128,
    /// Total bonded stake at tally time.
    pub total_power: u128,
    /// Votes deleted because their voter is no longer a validator.
    pub stale: usize,
    /// Vote records deleted because they failed to decode.
    pub corrupt: usize,
}

/// Tally `program_id`, deleting votes from non-validators.
pub fn tally(
    store: &mut dyn KvStore,
    weights: &dyn ValidatorWeightSource,
    program_id: u64,
) -> Result<Tally, ConcordError> {
    let total_power = weights.total_bonded_stake();
    let mut vote_power: i128 = 0;
    let mut stale: Vec<AccountId> = Vec::new();

    let scan = ProgramStore::scan_votes(store, program_id)?;
    for (_, vote) in &scan.entries {
        match weights.stake_of(&ValidatorId::from(vote.voter)) {
            Some(stake) => {
                let stake = i128::try_from(stake).unwrap_or(i128::MAX);
                vote_power = match vote.option {
                    VoteOption::Yes => vote_power.saturating_add(stake),
                    VoteOption::No => vote_power.saturating_sub(stake),
                };
            }
            None => stale.push(vote.voter),
        }
    }

    for voter in &stale {
        tracing::warn!(program_id, %voter, "deleting governance vote from non-validator");
        ProgramStore::remove_vote(store, program_id, voter)?;
    }
    for key in &scan.corrupt {
        store.delete(key)?;
    }

    Ok(Tally {
        vote_power,
        total_power,
        stale: stale.len(),
        corrupt: scan.corrupt.len(),
    })
}
