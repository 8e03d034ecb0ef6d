// crates/concord-store/src/rocks.rs
//
// RocksDB-backed key-value view.
//
// Keys are the structured byte keys from `concord_core::keys`, stored as-is;
// RocksDB's default bytewise comparator gives the same ascending order as
// `MemoryStore`, so the two are interchangeable under the tally engines.

use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options};

use concord_core::error::ConcordError;

use crate::kv::{KvIter, KvStore};

/// RocksDB wrapper implementing `KvStore`.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, ConcordError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            ConcordError::Storage(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        tracing::debug!(path, "opened RocksDB state store");
        Ok(Self { db })
    }
}

impl KvStore for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ConcordError> {
        self.db
            .get(key)
            .map_err(|e| ConcordError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), ConcordError> {
        self.db
            .put(key, value)
            .map_err(|e| ConcordError::Storage(format!("RocksDB put failed: {}", e)))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), ConcordError> {
        self.db
            .delete(key)
            .map_err(|e| ConcordError::Storage(format!("RocksDB delete failed: {}", e)))
    }

    fn prefix_iter(&self, prefix: &[u8]) -> KvIter<'_> {
        let owned_prefix = prefix.to_vec();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        // No prefix extractor is configured, so the iterator runs to the end of
        // the keyspace; stop at the first key outside the prefix.
        Box::new(
            iter.map(|item| {
                item.map(|(key, value)| (key.to_vec(), value.to_vec()))
                    .map_err(|e| {
                        ConcordError::Storage(format!("RocksDB iteration error: {}", e))
                    })
            })
            .take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&owned_prefix),
                Err(_) => true,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvStoreExt;

    fn temp_db_path(label: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let path = std::env::temp_dir().join(format!("concord_test_{}_{}", label, nanos));
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_prefix_iter_matches_memory_order() {
        let path = temp_db_path("prefix");
        let mut store = RocksStore::open(&path).unwrap();
        store.set(b"b2", b"").unwrap();
        store.set(b"a1", b"").unwrap();
        store.set(b"b1", b"").unwrap();
        store.set(b"c1", b"").unwrap();

        let keys = store.collect_keys(b"b").unwrap();
        assert_eq!(keys, vec![b"b1".to_vec(), b"b2".to_vec()]);

        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }
}
