// crates/concord-budget/src/store.rs
//
// Persisted budget state:
//   0x10 ‖ id                 program
//   0x11 ‖ end_block ‖ id     candidate expiry queue (empty value)
//   0x12 ‖ id ‖ voter         governance vote
//   0x13                      next program id

use concord_core::error::ConcordError;
use concord_core::identity::AccountId;
use concord_core::keys::{
    candidate_queue_key, candidate_queue_prefix, governance_vote_key,
    governance_vote_program_prefix, next_program_id_key, parse_candidate_queue_key, program_key,
    program_prefix,
};
use concord_store::{JsonScan, KvStore, KvStoreExt};

use crate::program::{GovernanceVote, Program};

/// First id handed out to a program.
pub const FIRST_PROGRAM_ID: u64 = 1;

/// Typed access to programs, the candidate queue, and governance votes.
pub struct ProgramStore;

impl ProgramStore {
    // -- ids -----------------------------------------------------------------

    /// Take the next program id and advance the counter.
    pub fn allocate_id(store: &mut dyn KvStore) -> Result<u64, ConcordError> {
        let id: u64 = store
            .get_json(&next_program_id_key())?
            .unwrap_or(FIRST_PROGRAM_ID);
        let next = id
            .checked_add(1)
            .ok_or_else(|| ConcordError::Storage("program id counter exhausted".into()))?;
        store.set_json(&next_program_id_key(), &next)?;
        Ok(id)
    }

    // -- programs ------------------------------------------------------------

    pub fn get(store: &dyn KvStore, id: u64) -> Result<Option<Program>, ConcordError> {
        store.get_json(&program_key(id))
    }

    pub fn put(store: &mut dyn KvStore, program: &Program) -> Result<(), ConcordError> {
        store.set_json(&program_key(program.id), program)
    }

    pub fn remove(store: &mut dyn KvStore, id: u64) -> Result<(), ConcordError> {
        store.delete(&program_key(id))
    }

    /// Every decodable program in ascending id order.
    pub fn all(store: &dyn KvStore) -> Result<Vec<Program>, ConcordError> {
        Ok(Self::scan(store)?.into_values())
    }

    /// Every program plus the keys of program records that fail to decode.
    pub fn scan(store: &dyn KvStore) -> Result<JsonScan<Program>, ConcordError> {
        store.scan_json(&program_prefix())
    }

    // -- candidate queue -----------------------------------------------------

    pub fn enqueue(store: &mut dyn KvStore, end_block: u64, id: u64) -> Result<(), ConcordError> {
        store.set(&candidate_queue_key(end_block, id), &[])
    }

    pub fn dequeue(store: &mut dyn KvStore, end_block: u64, id: u64) -> Result<(), ConcordError> {
        store.delete(&candidate_queue_key(end_block, id))
    }

    /// Queue entries whose voting window ended at or before `height`, as
    /// `(end_block, id)` ascending. Entries left behind by an earlier block
    /// are picked up here too.
    pub fn due_by(store: &dyn KvStore, height: u64) -> Result<Vec<(u64, u64)>, ConcordError> {
        let mut due = Vec::new();
        for item in store.prefix_iter(&candidate_queue_prefix()) {
            let (key, _) = item?;
            let (end_block, id) = parse_candidate_queue_key(&key)?;
            if end_block > height {
                break;
            }
            due.push((end_block, id));
        }
        Ok(due)
    }

    /// The whole queue as `(end_block, id)`, ascending.
    pub fn queue(store: &dyn KvStore) -> Result<Vec<(u64, u64)>, ConcordError> {
        store
            .collect_keys(&candidate_queue_prefix())?
            .iter()
            .map(|key| parse_candidate_queue_key(key))
            .collect()
    }

    // -- votes ---------------------------------------------------------------

    pub fn put_vote(store: &mut dyn KvStore, vote: &GovernanceVote) -> Result<(), ConcordError> {
        store.set_json(&governance_vote_key(vote.program_id, &vote.voter), vote)
    }

    pub fn remove_vote(
        store: &mut dyn KvStore,
        program_id: u64,
        voter: &AccountId,
    ) -> Result<(), ConcordError> {
        store.delete(&governance_vote_key(program_id, voter))
    }

    /// Decodable votes on `program_id` in voter order.
    pub fn votes_for(store: &dyn KvStore, program_id: u64) -> Result<Vec<GovernanceVote>, ConcordError> {
        Ok(Self::scan_votes(store, program_id)?.into_values())
    }

    /// Votes on `program_id` plus the keys of vote records that fail to
    /// decode.
    pub fn scan_votes(
        store: &dyn KvStore,
        program_id: u64,
    ) -> Result<JsonScan<GovernanceVote>, ConcordError> {
        store.scan_json(&governance_vote_program_prefix(program_id))
    }

    /// Delete every vote on `program_id`. Returns how many were removed.
    pub fn clear_votes(store: &mut dyn KvStore, program_id: u64) -> Result<usize, ConcordError> {
        store.delete_prefix(&governance_vote_program_prefix(program_id))
    }

    /// Delete a program together with its votes.
    pub fn purge(store: &mut dyn KvStore, program_id: u64) -> Result<(), ConcordError> {
        Self::clear_votes(store, program_id)?;
        Self::remove(store, program_id)
    }
}
