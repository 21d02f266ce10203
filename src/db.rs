//! Database Handle
//!
//! [`Db`] owns one opened engine variant and exposes its operations, plus
//! the buffered get adapter used by callers that want a copy of the value
//! instead of a callback.

use std::fmt;

use crate::config::Config;
use crate::engine::{Engine, KvSink, ValueSink};
use crate::error::{KvError, Result};
use crate::factory;

/// An opened engine
pub struct Db {
    engine: Box<dyn Engine>,
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl Db {
    /// Open the engine variant `engine` with `config`
    ///
    /// See [`crate::factory`] for which variants need which config fields.
    pub fn open(engine: &str, config: Option<&Config>) -> Result<Self> {
        factory::open(engine, config)
    }

    pub(crate) fn from_engine(engine: Box<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Name of the variant behind this handle
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.engine.exists(key)
    }

    /// Deliver the value of `key` to `sink`
    pub fn get_with(&self, key: &[u8], sink: &mut ValueSink<'_>) -> Result<()> {
        self.engine.get(key, sink)
    }

    /// Owned copy of the value of `key`
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let mut value = Vec::new();
        self.engine.get(key, &mut |v| value.extend_from_slice(v))?;
        Ok(value)
    }

    /// Copy the value of `key` into `buffer`
    ///
    /// The buffer is zeroed first. On a hit the value length is written to
    /// `value_size` before anything else; the copy happens, and the call
    /// succeeds, only when the value is strictly shorter than the buffer.
    /// Otherwise the call fails with nothing copied.
    pub fn get_copy(
        &self,
        key: &[u8],
        buffer: &mut [u8],
        value_size: Option<&mut usize>,
    ) -> Result<()> {
        let capacity = buffer.len();
        self.copy_value(key, capacity, Some(buffer), value_size)
    }

    /// Buffered get where the buffer itself is optional. Without a buffer
    /// the outcome and `value_size` are reported as if one of
    /// `buffer_size` bytes had been given.
    pub(crate) fn copy_value(
        &self,
        key: &[u8],
        buffer_size: usize,
        mut buffer: Option<&mut [u8]>,
        mut value_size: Option<&mut usize>,
    ) -> Result<()> {
        if let Some(buf) = buffer.as_deref_mut() {
            buf.fill(0);
        }

        let mut outcome = Err(KvError::not_found("key"));

        let looked_up = self.engine.get(key, &mut |value| {
            if let Some(size) = value_size.as_deref_mut() {
                *size = value.len();
            }

            outcome = if value.len() < buffer_size {
                if let Some(buf) = buffer.as_deref_mut() {
                    buf[..value.len()].copy_from_slice(value);
                }
                Ok(())
            } else {
                Err(KvError::failed(format!(
                    "value of {} bytes does not fit in a buffer of {} bytes",
                    value.len(),
                    buffer_size
                )))
            };
        });

        match looked_up {
            Ok(()) | Err(KvError::NotFound(_)) => outcome,
            Err(e) => Err(e),
        }
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.engine.put(key, value)
    }

    pub fn remove(&self, key: &[u8]) -> Result<()> {
        self.engine.remove(key)
    }

    // =========================================================================
    // Range Operations
    // =========================================================================

    pub fn count_all(&self) -> Result<usize> {
        self.engine.count_all()
    }

    pub fn count_above(&self, key: &[u8]) -> Result<usize> {
        self.engine.count_above(key)
    }

    pub fn count_below(&self, key: &[u8]) -> Result<usize> {
        self.engine.count_below(key)
    }

    pub fn count_between(&self, lower: &[u8], upper: &[u8]) -> Result<usize> {
        self.engine.count_between(lower, upper)
    }

    pub fn get_all(&self, sink: &mut KvSink<'_>) -> Result<()> {
        self.engine.get_all(sink)
    }

    pub fn get_above(&self, key: &[u8], sink: &mut KvSink<'_>) -> Result<()> {
        self.engine.get_above(key, sink)
    }

    pub fn get_below(&self, key: &[u8], sink: &mut KvSink<'_>) -> Result<()> {
        self.engine.get_below(key, sink)
    }

    pub fn get_between(&self, lower: &[u8], upper: &[u8], sink: &mut KvSink<'_>) -> Result<()> {
        self.engine.get_between(lower, upper, sink)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drop every record
    pub fn clear(&self) -> Result<()> {
        self.engine.clear()
    }

    /// Flush the engine's state to its backing medium
    pub fn sync(&self) -> Result<()> {
        self.engine.sync()
    }

    /// Close the handle, reporting any error from the final flush
    pub fn close(self) -> Result<()> {
        self.engine.sync()?;
        tracing::debug!(engine = self.engine.name(), "engine closed");
        Ok(())
    }
}
