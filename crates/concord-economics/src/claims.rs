// crates/concord-economics/src/claims.rs
//
// ClaimPool: staging accumulator of reward weight per recipient.
//
// The oracle and the budget module each own a pool under their own
// namespace byte (`0x20 ‖ namespace ‖ recipient`). Claims are additive and
// survive until the next epoch distribution, which always clears the pool.

use serde::{Deserialize, Serialize};

use concord_core::error::ConcordError;
use concord_core::identity::AccountId;
use concord_core::keys::{claim_key, claim_prefix, recipient_from_claim_key};
use concord_store::{KvStore, KvStoreExt};

/// Namespace of the price oracle's claim pool.
pub const ORACLE_NAMESPACE: u8 = 0x01;

/// Namespace of the budget module's claim pool.
pub const BUDGET_NAMESPACE: u8 = 0x02;

/// A reward claim: `recipient` is owed a share proportional to `weight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub recipient: AccountId,
    pub weight: u128,
}

impl Claim {
    pub fn new(recipient: AccountId, weight: u128) -> Self {
        Self { recipient, weight }
    }
}

/// Handle onto one namespaced claim pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPool {
    namespace: u8,
}

impl ClaimPool {
    pub const fn new(namespace: u8) -> Self {
        Self { namespace }
    }

    /// The oracle's pool.
    pub const fn oracle() -> Self {
        Self::new(ORACLE_NAMESPACE)
    }

    /// The budget module's pool.
    pub const fn budget() -> Self {
        Self::new(BUDGET_NAMESPACE)
    }

    pub fn namespace(&self) -> u8 {
        self.namespace
    }

    /// Add `weight` to `recipient`'s claim. Zero weights are ignored so the
    /// pool never carries entries that can't earn anything.
    pub fn add(
        &self,
        store: &mut dyn KvStore,
        recipient: &AccountId,
        weight: u128,
    ) -> Result<(), ConcordError> {
        if weight == 0 {
            return Ok(());
        }
        let key = claim_key(self.namespace, recipient);
        let previous: u128 = match store.get_json(&key) {
            Ok(weight) => weight.unwrap_or(0),
            Err(ConcordError::Serialization(e)) => {
                tracing::warn!(%recipient, "overwriting undecodable claim: {}", e);
                0
            }
            Err(e) => return Err(e),
        };
        let updated = previous.checked_add(weight).unwrap_or_else(|| {
            tracing::warn!(%recipient, "claim weight saturated");
            u128::MAX
        });
        store.set_json(&key, &updated)
    }

    /// Add every claim in order.
    pub fn add_all(&self, store: &mut dyn KvStore, claims: &[Claim]) -> Result<(), ConcordError> {
        for claim in claims {
            self.add(store, &claim.recipient, claim.weight)?;
        }
        Ok(())
    }

    /// Accumulated weight of `recipient` (zero if absent).
    pub fn weight_of(&self, store: &dyn KvStore, recipient: &AccountId) -> Result<u128, ConcordError> {
        Ok(store
            .get_json(&claim_key(self.namespace, recipient))?
            .unwrap_or(0))
    }

    /// Every claim in recipient key order. Entries with an undecodable
    /// weight or key are logged and skipped; `clear` still removes them.
    pub fn claims(&self, store: &dyn KvStore) -> Result<Vec<Claim>, ConcordError> {
        let scan = store.scan_json::<u128>(&claim_prefix(self.namespace))?;
        let mut claims = Vec::with_capacity(scan.entries.len());
        for (key, weight) in scan.entries {
            match recipient_from_claim_key(&key) {
                Ok(recipient) => claims.push(Claim::new(recipient, weight)),
                Err(e) => {
                    tracing::warn!(namespace = self.namespace, "skipping claim: {}", e);
                }
            }
        }
        Ok(claims)
    }

    /// Sum of all claim weights.
    pub fn total_weight(&self, store: &dyn KvStore) -> Result<u128, ConcordError> {
        Ok(self
            .claims(store)?
            .iter()
            .fold(0u128, |acc, c| acc.saturating_add(c.weight)))
    }

    /// Remove every claim. Returns how many were removed.
    pub fn clear(&self, store: &mut dyn KvStore) -> Result<usize, ConcordError> {
        store.delete_prefix(&claim_prefix(self.namespace))
    }
}
