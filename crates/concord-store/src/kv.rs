// crates/concord-store/src/kv.rs
//
// The ordered key-value view every keeper reads and writes.
//
// Iteration is always in ascending byte order of the key. Tallies fold
// weights in that order, so an implementation that iterates in any other
// order would make nodes disagree.

use serde::de::DeserializeOwned;
use serde::Serialize;

use concord_core::error::ConcordError;

/// A key-value pair yielded by prefix iteration.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Ordered iterator over a key range.
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<KvPair, ConcordError>> + 'a>;

/// Result of a lenient prefix scan: the values that decoded, plus the keys
/// of the ones that did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonScan<T> {
    pub entries: Vec<(Vec<u8>, T)>,
    pub corrupt: Vec<Vec<u8>>,
}

impl<T> JsonScan<T> {
    /// Drop the keys and keep the decoded values, in key order.
    pub fn into_values(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }
}

/// Transactional key-value view scoped to one block's execution.
pub trait KvStore {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ConcordError>;

    /// Store `value` under `key`, overwriting any previous value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), ConcordError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), ConcordError>;

    /// Iterate every entry whose key starts with `prefix`, in ascending key
    /// order. The iterator stops at the first key outside the prefix, so
    /// callers can short-circuit with `take_while`/`find` without scanning the
    /// remainder.
    fn prefix_iter(&self, prefix: &[u8]) -> KvIter<'_>;
}

/// JSON-typed helpers layered over any `KvStore`.
pub trait KvStoreExt: KvStore {
    /// Read and deserialize the value under `key`.
    fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, ConcordError> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`.
    fn set_json<T: Serialize>(&mut self, key: &[u8], value: &T) -> Result<(), ConcordError> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes)
    }

    /// Whether a value is stored under `key`.
    fn has(&self, key: &[u8]) -> Result<bool, ConcordError> {
        Ok(self.get(key)?.is_some())
    }

    /// Collect every key under `prefix`. Used to gather deletions before
    /// applying them, so no iterator is alive while the store is mutated.
    fn collect_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, ConcordError> {
        self.prefix_iter(prefix)
            .map(|item| item.map(|(key, _)| key))
            .collect()
    }

    /// Collect and deserialize every value under `prefix`, in key order.
    fn collect_json<T: DeserializeOwned>(
        &self,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, T)>, ConcordError> {
        let mut out = Vec::new();
        for item in self.prefix_iter(prefix) {
            let (key, bytes) = item?;
            out.push((key, serde_json::from_slice(&bytes)?));
        }
        Ok(out)
    }

    /// Like `collect_json`, but a value that fails to decode is logged and
    /// skipped instead of failing the scan. Periodic passes read through
    /// this so one bad record cannot stall them.
    fn scan_json<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<JsonScan<T>, ConcordError> {
        let mut scan = JsonScan {
            entries: Vec::new(),
            corrupt: Vec::new(),
        };
        for item in self.prefix_iter(prefix) {
            let (key, bytes) = item?;
            match serde_json::from_slice(&bytes) {
                Ok(value) => scan.entries.push((key, value)),
                Err(e) => {
                    tracing::warn!(key = ?key, "skipping undecodable record: {}", e);
                    scan.corrupt.push(key);
                }
            }
        }
        Ok(scan)
    }

    /// Delete every key under `prefix`. Returns how many were removed.
    fn delete_prefix(&mut self, prefix: &[u8]) -> Result<usize, ConcordError> {
        let keys = self.collect_keys(prefix)?;
        for key in &keys {
            self.delete(key)?;
        }
        Ok(keys.len())
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
