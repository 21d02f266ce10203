//! Pool engines
//!
//! `cmap` (hash), `stree` and `tree3` (sorted) keep their records in a single
//! pool file at the configured `path`. A missing file is created with
//! capacity `size`; an existing file is loaded and `size` is ignored.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (28 bytes)                                            │
//! │   Magic: "PKVP" (4) | Version: u16 (2) | Layout: u8 (1)      │
//! │   Reserved: u8 (1)  | Capacity: u64 (8) | PayloadLen: u64 (8)│
//! │   PayloadCRC: u32 (4)                                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload: bincode Vec<PoolRecord>                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The in-memory records are written back on [`Engine::sync`] and when the
//! engine is dropped, via a temporary file renamed over the pool.

use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::index::{HashIndex, Index, Records, SortedIndex};
use crate::engine::{Engine, KvSink, ValueSink};
use crate::error::{KvError, Result};

/// Magic bytes identifying a pool file
const MAGIC: &[u8; 4] = b"PKVP";

/// Current pool format version
const VERSION: u16 = 1;

/// Magic (4) + Version (2) + Layout (1) + Reserved (1) + Capacity (8)
/// + PayloadLen (8) + PayloadCRC (4)
const HEADER_SIZE: usize = 28;

/// Persistent concurrent hash map
pub type CMap = PoolEngine<HashIndex>;

/// Persistent sorted tree
pub type STree = PoolEngine<SortedIndex>;

/// Persistent B+ tree
pub type Tree3 = PoolEngine<SortedIndex>;

/// Record layout stored in the pool header; a pool only opens with the
/// engine that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Layout {
    CMap = 1,
    STree = 2,
    Tree3 = 3,
}

impl Layout {
    pub fn engine_name(self) -> &'static str {
        match self {
            Layout::CMap => "cmap",
            Layout::STree => "stree",
            Layout::Tree3 => "tree3",
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Layout::CMap),
            2 => Some(Layout::STree),
            3 => Some(Layout::Tree3),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PoolRecord {
    key: Vec<u8>,
    value: Vec<u8>,
}

/// Engine backed by a single pool file
pub struct PoolEngine<I: Index> {
    layout: Layout,
    path: PathBuf,
    records: RwLock<Records<I>>,

    /// Set by every mutation, cleared by a successful write-back
    dirty: AtomicBool,
}

impl<I: Index> PoolEngine<I> {
    /// Open the pool at `path`, creating it with capacity `size` if missing
    pub(crate) fn open(layout: Layout, path: &Path, size: u64) -> Result<Self> {
        let records = if path.exists() {
            let records = load_pool(path, layout)?;
            tracing::debug!(
                engine = layout.engine_name(),
                path = %path.display(),
                used = records.used(),
                "pool opened"
            );
            records
        } else {
            if size == 0 {
                return Err(KvError::failed(format!(
                    "cannot create pool {}: 'size' must be non-zero",
                    path.display()
                )));
            }
            let records = Records::new(size);
            write_pool(path, layout, &records)?;
            tracing::debug!(
                engine = layout.engine_name(),
                path = %path.display(),
                capacity = size,
                "pool created"
            );
            records
        };

        Ok(Self {
            layout,
            path: path.to_path_buf(),
            records: RwLock::new(records),
            dirty: AtomicBool::new(false),
        })
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

impl<I: Index> Engine for PoolEngine<I> {
    fn name(&self) -> &'static str {
        self.layout.engine_name()
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
        self.records.write().put(key, value)?;
        self.mark_dirty();
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.records.write().remove(key)?;
        self.mark_dirty();
        Ok(())
    }

    fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, sink: &mut KvSink<'_>) -> Result<()> {
        self.records.read().scan(lower, upper, sink);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.records.write().clear();
        self.mark_dirty();
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        // Hold the read lock across the write so no mutation slips between
        // the snapshot and clearing the flag
        let records = self.records.read();
        if self.dirty.swap(false, Ordering::AcqRel) {
            if let Err(e) = write_pool(&self.path, self.layout, &*records) {
                self.mark_dirty();
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<I: Index> Drop for PoolEngine<I> {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            tracing::error!(path = %self.path.display(), error = %e, "failed to write back pool");
        }
    }
}

// =============================================================================
// Pool File I/O
// =============================================================================

fn write_pool<I: Index>(path: &Path, layout: Layout, records: &Records<I>) -> Result<()> {
    let mut snapshot = Vec::new();
    records.scan(Bound::Unbounded, Bound::Unbounded, &mut |key, value| {
        snapshot.push(PoolRecord {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    });
    let payload = bincode::serialize(&snapshot)?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.push(layout as u8);
    bytes.push(0);
    bytes.extend_from_slice(&records.capacity().to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);

    // Write beside the pool and rename over it so a crash mid-write leaves
    // the previous pool intact
    let tmp = path.with_extension("pool.tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn load_pool<I: Index>(path: &Path, layout: Layout) -> Result<Records<I>> {
    let bytes = fs::read(path)?;
    if bytes.len() < HEADER_SIZE {
        return Err(KvError::Corruption(format!(
            "{}: file is {} bytes, shorter than the pool header",
            path.display(),
            bytes.len()
        )));
    }

    let (header, payload) = bytes.split_at(HEADER_SIZE);

    if &header[0..4] != MAGIC {
        return Err(KvError::Corruption(format!(
            "{}: invalid pool magic {:?}",
            path.display(),
            &header[0..4]
        )));
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(KvError::Corruption(format!(
            "{}: unsupported pool version {}",
            path.display(),
            version
        )));
    }

    match Layout::from_byte(header[6]) {
        Some(found) if found == layout => {}
        Some(found) => {
            return Err(KvError::failed(format!(
                "{} was created by engine '{}', cannot open it as '{}'",
                path.display(),
                found.engine_name(),
                layout.engine_name()
            )));
        }
        None => {
            return Err(KvError::Corruption(format!(
                "{}: unknown pool layout {}",
                path.display(),
                header[6]
            )));
        }
    }

    let capacity = read_u64(&header[8..16]);
    let payload_len = read_u64(&header[16..24]);
    let expected_crc = u32::from_le_bytes([header[24], header[25], header[26], header[27]]);

    if payload.len() as u64 != payload_len {
        return Err(KvError::Corruption(format!(
            "{}: payload is {} bytes, header says {}",
            path.display(),
            payload.len(),
            payload_len
        )));
    }

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(KvError::Corruption(format!(
            "{}: checksum mismatch (expected {:08x}, got {:08x})",
            path.display(),
            expected_crc,
            actual_crc
        )));
    }

    let snapshot: Vec<PoolRecord> = bincode::deserialize(payload)?;
    let mut records = Records::new(capacity);
    for record in snapshot {
        records.put(&record.key, &record.value)?;
    }
    Ok(records)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
