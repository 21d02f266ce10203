//! Caching engine
//!
//! Layers record expiry over a sub-engine chosen by the config:
//!
//! | key                | type          | meaning                              |
//! |--------------------|---------------|--------------------------------------|
//! | `subengine`        | string        | variant holding the cached records   |
//! | `subengine_config` | nested config | config the sub-engine is opened with |
//! | `ttl`              | uint64        | seconds a record stays readable; 0 or absent means forever |
//!
//! Every stored value is prefixed with its write time (unix millis, 8 bytes,
//! big-endian). Expired records read as absent and are skipped by counts and
//! iteration; a point read of an expired record removes it.

use std::ops::Bound;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::engine::{Engine, KvSink, ValueSink};
use crate::error::{KvError, Result};
use crate::factory;

const STAMP_SIZE: usize = 8;

pub struct Caching {
    inner: Box<dyn Engine>,
    ttl: Option<Duration>,
}

impl Caching {
    pub(crate) fn open(config: &Config) -> Result<Self> {
        let subengine = config
            .get_string("subengine")
            .map_err(|e| KvError::failed(format!("caching engine needs 'subengine': {}", e)))?;

        if subengine == "caching" {
            return Err(KvError::failed("caching engine cannot cache itself"));
        }

        let sub_config = config.get_config("subengine_config").map_err(|e| {
            KvError::failed(format!("caching engine needs 'subengine_config': {}", e))
        })?;

        let ttl = match config.get_uint64("ttl") {
            Ok(0) | Err(KvError::NotFound(_)) => None,
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(e) => return Err(KvError::failed(format!("invalid 'ttl': {}", e))),
        };

        let inner = factory::open_engine(subengine, Some(sub_config))?;

        tracing::debug!(subengine, ttl = ?ttl, "caching engine opened");

        Ok(Self { inner, ttl })
    }

    fn is_expired(&self, stamp: u64, now: u64) -> bool {
        match self.ttl {
            Some(ttl) => {
                let ttl = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
                now.saturating_sub(stamp) > ttl
            }
            None => false,
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Split a stored value into its write time and payload
fn unstamp(raw: &[u8]) -> Option<(u64, &[u8])> {
    if raw.len() < STAMP_SIZE {
        return None;
    }
    let (stamp, value) = raw.split_at(STAMP_SIZE);
    let mut buf = [0u8; STAMP_SIZE];
    buf.copy_from_slice(stamp);
    Some((u64::from_be_bytes(buf), value))
}

impl Engine for Caching {
    fn name(&self) -> &'static str {
        "caching"
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        match self.get(key, &mut |_| {}) {
            Ok(()) => Ok(true),
            Err(KvError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn get(&self, key: &[u8], sink: &mut ValueSink<'_>) -> Result<()> {
        let now = now_millis();
        let mut expired = false;
        let mut malformed = false;

        self.inner.get(key, &mut |raw| match unstamp(raw) {
            Some((stamp, _)) if self.is_expired(stamp, now) => expired = true,
            Some((_, value)) => sink(value),
            None => malformed = true,
        })?;

        if malformed {
            return Err(KvError::Corruption(
                "cached record is missing its timestamp".to_string(),
            ));
        }
        if expired {
            if let Err(e) = self.inner.remove(key) {
                tracing::warn!(error = %e, "failed to evict expired record");
            }
            return Err(KvError::not_found("key"));
        }
        Ok(())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut stamped = Vec::with_capacity(STAMP_SIZE + value.len());
        stamped.extend_from_slice(&now_millis().to_be_bytes());
        stamped.extend_from_slice(value);
        self.inner.put(key, &stamped)
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.inner.remove(key)
    }

    fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, sink: &mut KvSink<'_>) -> Result<()> {
        let now = now_millis();
        self.inner.scan(lower, upper, &mut |key, raw| match unstamp(raw) {
            Some((stamp, value)) if !self.is_expired(stamp, now) => sink(key, value),
            Some(_) => {}
            None => tracing::warn!("skipping cached record without a timestamp"),
        })
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()
    }

    fn sync(&self) -> Result<()> {
        self.inner.sync()
    }
}
