//! Blackhole engine
//!
//! Accepts every write and stores nothing. Useful for measuring the overhead
//! of the layers above the engine.

use std::ops::Bound;

use crate::engine::{Engine, KvSink, ValueSink};
use crate::error::{KvError, Result};

#[derive(Debug, Default)]
pub struct Blackhole;

impl Blackhole {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for Blackhole {
    fn name(&self) -> &'static str {
        "blackhole"
    }

    fn exists(&self, _key: &[u8]) -> Result<bool> {
        Ok(false)
    }

    fn get(&self, _key: &[u8], _sink: &mut ValueSink<'_>) -> Result<()> {
        Err(KvError::not_found("key"))
    }

    fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    fn scan(&self, _lower: Bound<&[u8]>, _upper: Bound<&[u8]>, _sink: &mut KvSink<'_>) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}
