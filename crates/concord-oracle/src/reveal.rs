// crates/concord-oracle/src/reveal.rs
//
// Revealed price votes.
//
// Votes live under `0x02 ‖ denom ‖ validator` until the next price pass,
// which reads them grouped by denom and then deletes all of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use concord_core::error::ConcordError;
use concord_core::identity::ValidatorId;
use concord_core::keys::{vote_key, vote_prefix};
use concord_core::Decimal;
use concord_store::{KvStore, KvStoreExt};

/// A revealed price vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub denom: String,
    pub price: Decimal,
    pub voter: ValidatorId,
    /// Height at which the vote was revealed.
    pub revealed_at: u64,
}

/// Storage of revealed votes.
pub struct RevealStore;

impl RevealStore {
    pub fn get(
        store: &dyn KvStore,
        denom: &str,
        voter: &ValidatorId,
    ) -> Result<Option<Vote>, ConcordError> {
        store.get_json(&vote_key(denom, voter))
    }

    pub fn put(store: &mut dyn KvStore, vote: &Vote) -> Result<(), ConcordError> {
        store.set_json(&vote_key(&vote.denom, &vote.voter), vote)
    }

    /// Every vote grouped by denom, denoms ascending.
    ///
    /// Grouping uses the denom stored in the record; the key prefix already
    /// orders votes by (denom length, denom, voter). Votes that fail to
    /// decode are skipped; `clear` removes them with the rest.
    pub fn grouped(store: &dyn KvStore) -> Result<BTreeMap<String, Vec<Vote>>, ConcordError> {
        let mut grouped: BTreeMap<String, Vec<Vote>> = BTreeMap::new();
        for vote in store.scan_json::<Vote>(&vote_prefix())?.into_values() {
            grouped.entry(vote.denom.clone()).or_default().push(vote);
        }
        Ok(grouped)
    }

    /// Delete every vote. Returns how many were removed.
    pub fn clear(store: &mut dyn KvStore) -> Result<usize, ConcordError> {
        store.delete_prefix(&vote_prefix())
    }
}
