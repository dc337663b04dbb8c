use std::collections::BTreeMap;

use super::KvStore;

/// A write-buffering branch of a parent store.
///
/// Reads see the buffered writes layered over the parent. Nothing reaches the
/// parent until [`CacheKvStore::write`]; dropping the branch discards it.
pub struct CacheKvStore<'a> {
    parent: &'a mut dyn KvStore,
    // None marks a buffered delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheKvStore<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        CacheKvStore {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletes.
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Flushes buffered writes into the parent.
    pub fn write(self) {
        let CacheKvStore { parent, writes } = self;
        for (key, value) in writes {
            match value {
                Some(v) => parent.set(&key, v),
                None => parent.delete(&key),
            }
        }
    }
}

impl KvStore for CacheKvStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn prefix_entries(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_entries(prefix).into_iter().collect();
        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
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
        merged.into_iter().collect()
    }
}
