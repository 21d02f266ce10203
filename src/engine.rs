//! Engine Module
//!
//! The capability set shared by every engine variant.
//!
//! ## Responsibilities
//! - Point operations: get / put / remove / exists
//! - Ordered range operations over all keys, or keys above / below / between
//!   bounds. Bounds are exclusive and keys are visited in ascending
//!   lexicographic byte order.
//! - Bulk drop of all records
//!
//! Variants only implement [`Engine::scan`]; the count and iteration helpers
//! are derived from it.

use std::ops::Bound;

use crate::error::Result;

/// Sink receiving one key/value pair
pub type KvSink<'a> = dyn FnMut(&[u8], &[u8]) + 'a;

/// Sink receiving one value
pub type ValueSink<'a> = dyn FnMut(&[u8]) + 'a;

/// A storage engine variant
///
/// ## Concurrency
/// All methods take `&self`; variants guard their own state.
pub trait Engine: Send + Sync {
    /// Variant name as accepted by the factory
    fn name(&self) -> &'static str;

    /// `Ok(false)` when the key is absent
    fn exists(&self, key: &[u8]) -> Result<bool>;

    /// Deliver the value of `key` to `sink`; `KvError::NotFound` if absent
    fn get(&self, key: &[u8], sink: &mut ValueSink<'_>) -> Result<()>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// `KvError::NotFound` if absent
    fn remove(&self, key: &[u8]) -> Result<()>;

    /// Visit every record with `lower < key < upper` (per bound kind), in
    /// ascending key order
    fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, sink: &mut KvSink<'_>) -> Result<()>;

    /// Drop every record
    fn clear(&self) -> Result<()>;

    /// Flush buffered state to the backing medium, if there is one
    fn sync(&self) -> Result<()> {
        Ok(())
    }

    // =========================================================================
    // Derived range operations
    // =========================================================================

    fn count(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<usize> {
        let mut count = 0;
        self.scan(lower, upper, &mut |_, _| count += 1)?;
        Ok(count)
    }

    fn count_all(&self) -> Result<usize> {
        self.count(Bound::Unbounded, Bound::Unbounded)
    }

    fn count_above(&self, key: &[u8]) -> Result<usize> {
        self.count(Bound::Excluded(key), Bound::Unbounded)
    }

    fn count_below(&self, key: &[u8]) -> Result<usize> {
        self.count(Bound::Unbounded, Bound::Excluded(key))
    }

    fn count_between(&self, lower: &[u8], upper: &[u8]) -> Result<usize> {
        self.count(Bound::Excluded(lower), Bound::Excluded(upper))
    }

    fn get_all(&self, sink: &mut KvSink<'_>) -> Result<()> {
        self.scan(Bound::Unbounded, Bound::Unbounded, sink)
    }

    fn get_above(&self, key: &[u8], sink: &mut KvSink<'_>) -> Result<()> {
        self.scan(Bound::Excluded(key), Bound::Unbounded, sink)
    }

    fn get_below(&self, key: &[u8], sink: &mut KvSink<'_>) -> Result<()> {
        self.scan(Bound::Unbounded, Bound::Excluded(key), sink)
    }

    fn get_between(&self, lower: &[u8], upper: &[u8], sink: &mut KvSink<'_>) -> Result<()> {
        self.scan(Bound::Excluded(lower), Bound::Excluded(upper), sink)
    }
}

// =============================================================================
// Range Helpers
// =============================================================================

/// True when no key can satisfy both bounds
pub(crate) fn range_is_empty(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}

/// True when `key` lies inside the bounds
pub(crate) fn in_range(key: &[u8], lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    let above = match lower {
        Bound::Included(lo) => key >= lo,
        Bound::Excluded(lo) => key > lo,
        Bound::Unbounded => true,
    };
    let below = match upper {
        Bound::Included(hi) => key <= hi,
        Bound::Excluded(hi) => key < hi,
        Bound::Unbounded => true,
    };
    above && below
}
