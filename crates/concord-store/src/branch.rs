// crates/concord-store/src/branch.rs
//
// BranchStore: a write buffer layered over a parent view.
//
// Every message is executed inside its own branch. If the handler returns an
// error the branch is dropped and the parent is untouched; otherwise
// `commit()` replays the buffered writes onto the parent in key order.

use std::collections::BTreeMap;

use concord_core::error::ConcordError;

use crate::kv::{KvIter, KvStore};

/// Buffered writes over a parent `KvStore`. `None` marks a deletion.
pub struct BranchStore<'a> {
    parent: &'a mut dyn KvStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> BranchStore<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes (sets and deletes).
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Apply buffered writes to the parent.
    pub fn commit(self) -> Result<(), ConcordError> {
        let BranchStore { parent, writes } = self;
        for (key, value) in writes {
            match value {
                Some(v) => parent.set(&key, &v)?,
                None => parent.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl KvStore for BranchStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ConcordError> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), ConcordError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), ConcordError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn prefix_iter(&self, prefix: &[u8]) -> KvIter<'_> {
        // Materialize the parent range, then overlay buffered writes. Branches
        // live for a single message, so the merged range is small.
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for item in self.parent.prefix_iter(prefix) {
            match item {
                Ok((key, value)) => {
                    merged.insert(key, value);
                }
                Err(e) => return Box::new(std::iter::once(Err(e))),
            }
        }
        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Box::new(merged.into_iter().map(Ok))
    }
}
