//! In-memory record index
//!
//! Two index shapes back the map-based variants:
//! - [`SortedIndex`] (BTreeMap): range scans walk the tree directly
//! - [`HashIndex`] (HashMap): range scans filter and sort on demand
//!
//! [`Records`] wraps either with byte-capacity accounting.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use crate::engine::{in_range, range_is_empty, KvSink};
use crate::error::{KvError, Result};

pub type SortedIndex = BTreeMap<Vec<u8>, Vec<u8>>;
pub type HashIndex = HashMap<Vec<u8>, Vec<u8>>;

/// Map shape usable as an engine index
pub trait Index: Default + Send + Sync + 'static {
    fn lookup(&self, key: &[u8]) -> Option<&[u8]>;

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>);

    fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>>;

    fn clear(&mut self);

    /// Visit records inside the bounds in ascending key order
    fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, sink: &mut KvSink<'_>);
}

impl Index for SortedIndex {
    fn lookup(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key).map(Vec::as_slice)
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        BTreeMap::insert(self, key, value);
    }

    fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.remove(key)
    }

    fn clear(&mut self) {
        BTreeMap::clear(self);
    }

    fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, sink: &mut KvSink<'_>) {
        // BTreeMap::range panics on inverted bounds
        if range_is_empty(lower, upper) {
            return;
        }
        for (key, value) in self.range::<[u8], _>((lower, upper)) {
            sink(key, value);
        }
    }
}

impl Index for HashIndex {
    fn lookup(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key).map(Vec::as_slice)
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        HashMap::insert(self, key, value);
    }

    fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.remove(key)
    }

    fn clear(&mut self) {
        HashMap::clear(self);
    }

    fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, sink: &mut KvSink<'_>) {
        if range_is_empty(lower, upper) {
            return;
        }
        let mut hits: Vec<(&[u8], &[u8])> = self
            .iter()
            .filter(|(key, _)| in_range(key, lower, upper))
            .map(|(key, value)| (key.as_slice(), value.as_slice()))
            .collect();
        hits.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (key, value) in hits {
            sink(key, value);
        }
    }
}

// =============================================================================
// Capacity-bounded records
// =============================================================================

/// Index plus the number of key and value bytes it holds
///
/// A put that would push `used` past `capacity` fails and leaves the index
/// unchanged.
pub struct Records<I> {
    index: I,
    used: u64,
    capacity: u64,
}

impl<I: Index> Records<I> {
    pub(crate) fn new(capacity: u64) -> Self {
        Self {
            index: I::default(),
            used: 0,
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    pub(crate) fn used(&self) -> u64 {
        self.used
    }

    pub(crate) fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.index.lookup(key)
    }

    pub(crate) fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let replaced = self
            .index
            .lookup(key)
            .map_or(0, |old| record_size(key, old));
        let needed = self.used - replaced + record_size(key, value);

        if needed > self.capacity {
            return Err(KvError::OutOfSpace {
                needed,
                capacity: self.capacity,
            });
        }

        self.index.insert(key.to_vec(), value.to_vec());
        self.used = needed;
        Ok(())
    }

    pub(crate) fn remove(&mut self, key: &[u8]) -> Result<()> {
        match self.index.delete(key) {
            Some(value) => {
                self.used -= record_size(key, &value);
                Ok(())
            }
            None => Err(KvError::not_found("key")),
        }
    }

    pub(crate) fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, sink: &mut KvSink<'_>) {
        self.index.scan(lower, upper, sink);
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.used = 0;
    }
}

fn record_size(key: &[u8], value: &[u8]) -> u64 {
    (key.len() + value.len()) as u64
}
