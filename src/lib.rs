//! # pmemkv
//!
//! Entry layer of a key-value store with interchangeable engine variants:
//! - Type-tagged configuration store with owned nested configs
//! - JSON configuration import
//! - Engine selection by name
//! - C ABI with status codes and a per-thread last-error message
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 C ABI  (ffi: pmemkv_*)                       │
//! │        status codes · last-error slot · callbacks            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Config    │◄─────────│    JSON     │
//!   │ (typed map) │          │  importer   │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Factory   │─────────►│     Db      │
//!   │ (by name)   │          │  (handle)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                     ┌───────────────────────────┐
//!                     │      Engine variants      │
//!                     │ blackhole · caching · cmap│
//!                     │ stree · tree3 · vsmap ·   │
//!                     │ vcmap                     │
//!                     └───────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod status;
pub mod config;
pub mod json;

pub mod engine;
pub mod engines;
pub mod factory;
pub mod db;
pub mod ffi;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, ConfigBuilder, ConfigType};
pub use db::Db;
pub use engine::Engine;
pub use error::{KvError, Result};
pub use factory::EngineKind;
pub use status::Status;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of pmemkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
