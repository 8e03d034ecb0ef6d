// crates/concord-oracle/src/commit.rs
//
// Hash-locked price commitments.
//
// A validator (through its feeder) first publishes only `vote_hash(...)` for
// a denom. The matching reveal must arrive in the following vote period; the
// commitment is consumed by a successful reveal and otherwise simply
// overwritten by the validator's next commitment.

use serde::{Deserialize, Serialize};

use concord_core::crypto::VoteHash;
use concord_core::error::ConcordError;
use concord_core::identity::{AccountId, ValidatorId};
use concord_core::keys::commitment_key;
use concord_store::{KvStore, KvStoreExt};

/// A stored price commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub denom: String,
    pub hash: VoteHash,
    pub feeder: AccountId,
    pub validator: ValidatorId,
    /// Height at which the commitment was submitted.
    pub submitted_at: u64,
}

/// Storage of commitments under `0x01 ‖ denom ‖ validator`.
pub struct CommitStore;

impl CommitStore {
    pub fn get(
        store: &dyn KvStore,
        denom: &str,
        validator: &ValidatorId,
    ) -> Result<Option<Commitment>, ConcordError> {
        store.get_json(&commitment_key(denom, validator))
    }

    /// Store `commitment`, replacing any previous one for the same
    /// (denom, validator).
    pub fn put(store: &mut dyn KvStore, commitment: &Commitment) -> Result<(), ConcordError> {
        store.set_json(
            &commitment_key(&commitment.denom, &commitment.validator),
            commitment,
        )
    }

    pub fn remove(
        store: &mut dyn KvStore,
        denom: &str,
        validator: &ValidatorId,
    ) -> Result<(), ConcordError> {
        store.delete(&commitment_key(denom, validator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::crypto::vote_hash;
    use concord_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn commitment(denom: &str, v: u8, at: u64) -> Commitment {
        let validator = ValidatorId([v; 20]);
        Commitment {
            denom: denom.to_string(),
            hash: vote_hash("s", dec!(1), denom, &validator),
            feeder: AccountId::from(validator),
            validator,
            submitted_at: at,
        }
    }

    #[test]
    fn test_put_overwrites() {
        let mut store = MemoryStore::new();
        CommitStore::put(&mut store, &commitment("ukrw", 1, 5)).unwrap();
        CommitStore::put(&mut store, &commitment("ukrw", 1, 9)).unwrap();

        let got = CommitStore::get(&store, "ukrw", &ValidatorId([1; 20]))
            .unwrap()
            .unwrap();
        assert_eq!(got.submitted_at, 9);
    }

    #[test]
    fn test_remove() {
        let mut store = MemoryStore::new();
        CommitStore::put(&mut store, &commitment("ukrw", 1, 5)).unwrap();
        CommitStore::remove(&mut store, "ukrw", &ValidatorId([1; 20])).unwrap();
        assert!(CommitStore::get(&store, "ukrw", &ValidatorId([1; 20]))
            .unwrap()
            .is_none());
    }}
