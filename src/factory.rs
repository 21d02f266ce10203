//! Engine Factory
//!
//! Binds an engine name and a [`Config`] to one engine variant.
//!
//! ## Construction contract
//! Checks run in this order:
//! 1. `blackhole` needs no config.
//! 2. `caching` reads its own keys from the config, which must be present.
//! 3. Any other name needs a config; without one the open is an invalid
//!    argument, whether or not the name is known.
//! 4. The config must hold `path` (string) and `size` (uint64). A missing or
//!    mistyped field fails the open.
//! 5. Only then is the name resolved. Names of variants not compiled in are
//!    unknown.
//! 6. `vsmap` and `vcmap` additionally need `path` to be an existing
//!    directory; this is checked before the variant is constructed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::Config;
use crate::db::Db;
use crate::engine::Engine;
use crate::engines::Blackhole;
use crate::error::{KvError, Result};

/// Engine variants compiled into this build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Blackhole,
    #[cfg(feature = "engine-caching")]
    Caching,
    #[cfg(feature = "engine-cmap")]
    CMap,
    #[cfg(feature = "engine-stree")]
    STree,
    #[cfg(feature = "engine-tree3")]
    Tree3,
    #[cfg(feature = "engine-vsmap")]
    VSMap,
    #[cfg(feature = "engine-vcmap")]
    VCMap,
}

impl EngineKind {
    /// Every variant available in this build
    pub const ALL: &'static [EngineKind] = &[
        EngineKind::Blackhole,
        #[cfg(feature = "engine-caching")]
        EngineKind::Caching,
        #[cfg(feature = "engine-cmap")]
        EngineKind::CMap,
        #[cfg(feature = "engine-stree")]
        EngineKind::STree,
        #[cfg(feature = "engine-tree3")]
        EngineKind::Tree3,
        #[cfg(feature = "engine-vsmap")]
        EngineKind::VSMap,
        #[cfg(feature = "engine-vcmap")]
        EngineKind::VCMap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Blackhole => "blackhole",
            #[cfg(feature = "engine-caching")]
            EngineKind::Caching => "caching",
            #[cfg(feature = "engine-cmap")]
            EngineKind::CMap => "cmap",
            #[cfg(feature = "engine-stree")]
            EngineKind::STree => "stree",
            #[cfg(feature = "engine-tree3")]
            EngineKind::Tree3 => "tree3",
            #[cfg(feature = "engine-vsmap")]
            EngineKind::VSMap => "vsmap",
            #[cfg(feature = "engine-vcmap")]
            EngineKind::VCMap => "vcmap",
        }
    }

    /// Look a variant up by name; `None` for unknown or compiled-out names
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = KvError;

    fn from_str(name: &str) -> Result<Self> {
        Self::from_name(name).ok_or_else(|| KvError::failed("Unknown engine name"))
    }
}

/// Open an engine by name
pub fn open(engine: &str, config: Option<&Config>) -> Result<Db> {
    open_engine(engine, config).map(Db::from_engine)
}

pub(crate) fn open_engine(engine: &str, config: Option<&Config>) -> Result<Box<dyn Engine>> {
    let kind = match EngineKind::from_name(engine) {
        Some(kind) => kind,
        None => {
            PoolParams::from_config(engine, config)?;
            return Err(KvError::failed("Unknown engine name"));
        }
    };
    let opened = build(kind, config)?;
    tracing::debug!(engine = kind.name(), "engine opened");
    Ok(opened)
}

fn build(kind: EngineKind, config: Option<&Config>) -> Result<Box<dyn Engine>> {
    match kind {
        EngineKind::Blackhole => Ok(Box::new(Blackhole::new())),

        #[cfg(feature = "engine-caching")]
        EngineKind::Caching => {
            let config = require_config(kind.name(), config)?;
            Ok(Box::new(crate::engines::Caching::open(config)?))
        }

        #[cfg(feature = "engine-cmap")]
        EngineKind::CMap => {
            let params = PoolParams::from_config(kind.name(), config)?;
            Ok(Box::new(crate::engines::CMap::open(
                crate::engines::Layout::CMap,
                &params.path,
                params.size,
            )?))
        }

        #[cfg(feature = "engine-stree")]
        EngineKind::STree => {
            let params = PoolParams::from_config(kind.name(), config)?;
            Ok(Box::new(crate::engines::STree::open(
                crate::engines::Layout::STree,
                &params.path,
                params.size,
            )?))
        }

        #[cfg(feature = "engine-tree3")]
        EngineKind::Tree3 => {
            let params = PoolParams::from_config(kind.name(), config)?;
            Ok(Box::new(crate::engines::Tree3::open(
                crate::engines::Layout::Tree3,
                &params.path,
                params.size,
            )?))
        }

        #[cfg(feature = "engine-vsmap")]
        EngineKind::VSMap => {
            let params = PoolParams::from_config(kind.name(), config)?;
            params.require_directory()?;
            Ok(Box::new(crate::engines::VSMap::open(
                kind.name(),
                &params.path,
                params.size,
            )?))
        }

        #[cfg(feature = "engine-vcmap")]
        EngineKind::VCMap => {
            let params = PoolParams::from_config(kind.name(), config)?;
            params.require_directory()?;
            Ok(Box::new(crate::engines::VCMap::open(
                kind.name(),
                &params.path,
                params.size,
            )?))
        }
    }
}

fn require_config<'a>(engine: &str, config: Option<&'a Config>) -> Result<&'a Config> {
    config.ok_or_else(|| KvError::InvalidArgument(format!("engine '{}' requires a config", engine)))
}

/// `path` and `size` shared by every file- or directory-backed variant
struct PoolParams {
    path: PathBuf,
    size: u64,
}

impl PoolParams {
    fn from_config(engine: &str, config: Option<&Config>) -> Result<Self> {
        let config = require_config(engine, config)?;

        let path = config
            .get_string("path")
            .map_err(|_| KvError::failed("Config does not contain a valid path string"))?;

        let size = config
            .get_uint64("size")
            .map_err(|_| KvError::failed("Cannot get 'size' from the config"))?;

        Ok(Self {
            path: PathBuf::from(path),
            size,
        })
    }

    #[cfg(any(feature = "engine-vsmap", feature = "engine-vcmap"))]
    fn require_directory(&self) -> Result<()> {
        if is_directory(&self.path) {
            Ok(())
        } else {
            Err(KvError::failed(format!(
                "Config path is not an existing directory: {}",
                self.path.display()
            )))
        }
    }
}

#[cfg(any(feature = "engine-vsmap", feature = "engine-vcmap"))]
fn is_directory(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
