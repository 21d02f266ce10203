//! Volatile engines
//!
//! `vsmap` (sorted) and `vcmap` (hash) keep every record in memory. The
//! configured `path` must name an existing directory and `size` caps the
//! number of key and value bytes held; nothing is written to the directory.

use std::ops::Bound;
use std::path::Path;

use parking_lot::RwLock;

use super::index::{HashIndex, Index, Records, SortedIndex};
use crate::engine::{Engine, KvSink, ValueSink};
use crate::error::{KvError, Result};

/// Sorted volatile map
pub type VSMap = VolatileEngine<SortedIndex>;

/// Concurrent volatile hash map
pub type VCMap = VolatileEngine<HashIndex>;

/// In-memory engine over an index shape `I`
pub struct VolatileEngine<I> {
    name: &'static str,
    records: RwLock<Records<I>>,
}

impl<I: Index> VolatileEngine<I> {
    pub(crate) fn open(name: &'static str, dir: &Path, size: u64) -> Result<Self> {
        if size == 0 {
            return Err(KvError::failed(format!(
                "{} requires a non-zero 'size'",
                name
            )));
        }

        tracing::debug!(engine = name, dir = %dir.display(), capacity = size, "volatile engine opened");

        Ok(Self {
            name,
            records: RwLock::new(Records::new(size)),
        })
    }

}

impl<I: Index> Engine for VolatileEngine<I> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.records.read().get(key).is_some())
    }

    fn get(&self, key: &[u8], sink: &mut ValueSink<'_>) -> Result<()> {
        let records = self.records.read();
        let value = records.get(key).ok_or_else(|| KvError::not_found("key"))?;
        sink(value);
        Ok(())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.records.write().put(key, value)
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.records.write().remove(key)
    }

    fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, sink: &mut KvSink<'_>) -> Result<()> {
        self.records.read().scan(lower, upper, sink);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.records.write().clear();
        Ok(())
    }
}
