//! Configuration store
//!
//! A type-tagged key/value map used to parameterize engine construction.
//!
//! ## Ownership
//! The store owns every entry. OBJECT entries additionally own the object
//! they refer to: a nested [`Config`] is dropped with its parent, and a
//! foreign handle has its destructor run exactly once when the store drops.
//!
//! ## Immutability
//! There is no update or remove. A `put` against a key that already exists
//! succeeds and keeps the original value. An object offered that way is
//! still owned by the store and released with it, never earlier.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::c_void;
use std::path::Path;

use crate::error::{KvError, Result};

/// Destructor for a foreign object held in an OBJECT entry
pub type Destructor = Box<dyn FnOnce(*mut c_void)>;

/// Type tag of a config entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigType {
    String,
    Int64,
    UInt64,
    Double,
    Data,
    Object,
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigType::String => "STRING",
            ConfigType::Int64 => "INT64",
            ConfigType::UInt64 => "UINT64",
            ConfigType::Double => "DOUBLE",
            ConfigType::Data => "DATA",
            ConfigType::Object => "OBJECT",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Entry Representation
// =============================================================================

/// Opaque handle plus the capability that releases it
struct ForeignObject {
    handle: *mut c_void,
    destructor: Option<Destructor>,
}

impl Drop for ForeignObject {
    fn drop(&mut self) {
        if let Some(destroy) = self.destructor.take() {
            destroy(self.handle);
        }
    }
}

/// Object held by an OBJECT entry
enum ObjectValue {
    /// Nested store; dropped recursively with its parent
    Config(Box<Config>),

    /// Foreign object released through its destructor
    Foreign(ForeignObject),
}

impl ObjectValue {
    fn handle(&self) -> *mut c_void {
        match self {
            ObjectValue::Config(config) => &**config as *const Config as *mut c_void,
            ObjectValue::Foreign(object) => object.handle,
        }
    }

    /// Give up ownership without releasing anything.
    ///
    /// Used when a handle the store already owns is offered again.
    fn disarm(self) {
        match self {
            ObjectValue::Config(config) => {
                let _ = Box::into_raw(config);
            }
            ObjectValue::Foreign(mut object) => {
                object.destructor = None;
            }
        }
    }
}

enum ConfigValue {
    String(CString),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Data(Vec<u8>),
    Object(ObjectValue),
}

impl ConfigValue {
    fn config_type(&self) -> ConfigType {
        match self {
            ConfigValue::String(_) => ConfigType::String,
            ConfigValue::Int64(_) => ConfigType::Int64,
            ConfigValue::UInt64(_) => ConfigType::UInt64,
            ConfigValue::Double(_) => ConfigType::Double,
            ConfigValue::Data(_) => ConfigType::Data,
            ConfigValue::Object(_) => ConfigType::Object,
        }
    }

    /// Length of the entry's byte representation
    ///
    /// Strings count their NUL terminator; objects are one pointer wide.
    fn size(&self) -> usize {
        match self {
            ConfigValue::String(s) => s.as_bytes_with_nul().len(),
            ConfigValue::Int64(_) => std::mem::size_of::<i64>(),
            ConfigValue::UInt64(_) => std::mem::size_of::<u64>(),
            ConfigValue::Double(_) => std::mem::size_of::<f64>(),
            ConfigValue::Data(d) => d.len(),
            ConfigValue::Object(_) => std::mem::size_of::<*mut c_void>(),
        }
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "String({:?})", s),
            ConfigValue::Int64(v) => write!(f, "Int64({})", v),
            ConfigValue::UInt64(v) => write!(f, "UInt64({})", v),
            ConfigValue::Double(v) => write!(f, "Double({})", v),
            ConfigValue::Data(d) => write!(f, "Data({} bytes)", d.len()),
            ConfigValue::Object(ObjectValue::Config(c)) => write!(f, "Object({:?})", c),
            ConfigValue::Object(ObjectValue::Foreign(o)) => write!(f, "Object({:p})", o.handle),
        }
    }
}

// =============================================================================
// Config Store
// =============================================================================

/// Type-tagged configuration map
#[derive(Default)]
pub struct Config {
    entries: HashMap<String, ConfigValue>,

    /// Objects offered under an already used key; released with the store
    rejected: Vec<ObjectValue>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl Config {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    // -------------------------------------------------------------------------
    // Put
    // -------------------------------------------------------------------------

    /// Store a string. Fails if the value contains an interior NUL byte.
    pub fn put_string(&mut self, key: &str, value: &str) -> Result<()> {
        let value = CString::new(value).map_err(|_| {
            KvError::failed(format!(
                "string value for '{}' contains an interior NUL byte",
                key
            ))
        })?;
        self.insert(key, ConfigValue::String(value))
    }

    /// Store a NUL-terminated string as-is
    pub fn put_c_string(&mut self, key: &str, value: &CStr) -> Result<()> {
        self.insert(key, ConfigValue::String(value.to_owned()))
    }

    pub fn put_int64(&mut self, key: &str, value: i64) -> Result<()> {
        self.insert(key, ConfigValue::Int64(value))
    }

    pub fn put_uint64(&mut self, key: &str, value: u64) -> Result<()> {
        self.insert(key, ConfigValue::UInt64(value))
    }

    pub fn put_double(&mut self, key: &str, value: f64) -> Result<()> {
        self.insert(key, ConfigValue::Double(value))
    }

    pub fn put_data(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.insert(key, ConfigValue::Data(value.to_vec()))
    }

    /// Store a foreign object and take ownership of it.
    ///
    /// `destructor`, if given, is called with `handle` exactly once, when
    /// this store is dropped.
    pub fn put_object(
        &mut self,
        key: &str,
        handle: *mut c_void,
        destructor: Option<Destructor>,
    ) -> Result<()> {
        self.insert(
            key,
            ConfigValue::Object(ObjectValue::Foreign(ForeignObject { handle, destructor })),
        )
    }

    /// Store a nested config as an OBJECT entry
    pub fn put_config(&mut self, key: &str, config: Config) -> Result<()> {
        self.put_boxed_config(key, Box::new(config))
    }

    /// Store an already boxed nested config; its address becomes the entry's
    /// object handle.
    pub(crate) fn put_boxed_config(&mut self, key: &str, config: Box<Config>) -> Result<()> {
        self.insert(key, ConfigValue::Object(ObjectValue::Config(config)))
    }

    fn insert(&mut self, key: &str, value: ConfigValue) -> Result<()> {
        match self.entries.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(existing) => {
                tracing::warn!(key, "config key already set, keeping the original value");

                if let ConfigValue::Object(incoming) = value {
                    let handle = incoming.handle();
                    let already_owned = matches!(
                        existing.get(),
                        ConfigValue::Object(held) if held.handle() == handle
                    ) || self.rejected.iter().any(|held| held.handle() == handle);

                    if already_owned {
                        incoming.disarm();
                    } else {
                        self.rejected.push(incoming);
                    }
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Get
    // -------------------------------------------------------------------------

    pub fn get_string(&self, key: &str) -> Result<&str> {
        self.get_c_string(key)?
            .to_str()
            .map_err(|_| KvError::ConfigType(format!("config entry '{}' is not valid UTF-8", key)))
    }

    /// Stored string including its NUL terminator
    pub fn get_c_string(&self, key: &str) -> Result<&CStr> {
        match self.lookup(key)? {
            ConfigValue::String(s) => Ok(s.as_c_str()),
            other => Err(type_error(key, other, ConfigType::String)),
        }
    }

    /// Read an integer; UINT64 entries convert when below `i64::MAX`
    pub fn get_int64(&self, key: &str) -> Result<i64> {
        match self.lookup(key)? {
            ConfigValue::Int64(v) => Ok(*v),
            ConfigValue::UInt64(v) if *v < i64::MAX as u64 => Ok(*v as i64),
            other => Err(type_error(key, other, ConfigType::Int64)),
        }
    }

    /// Read an unsigned integer; non-negative INT64 entries convert
    pub fn get_uint64(&self, key: &str) -> Result<u64> {
        match self.lookup(key)? {
            ConfigValue::UInt64(v) => Ok(*v),
            ConfigValue::Int64(v) if *v >= 0 => Ok(*v as u64),
            other => Err(type_error(key, other, ConfigType::UInt64)),
        }
    }

    pub fn get_double(&self, key: &str) -> Result<f64> {
        match self.lookup(key)? {
            ConfigValue::Double(v) => Ok(*v),
            other => Err(type_error(key, other, ConfigType::Double)),
        }
    }

    pub fn get_data(&self, key: &str) -> Result<&[u8]> {
        match self.lookup(key)? {
            ConfigValue::Data(d) => Ok(d),
            other => Err(type_error(key, other, ConfigType::Data)),
        }
    }

    /// Opaque handle of an OBJECT entry. For nested configs this is the
    /// address of the nested [`Config`].
    pub fn get_object(&self, key: &str) -> Result<*mut c_void> {
        match self.lookup(key)? {
            ConfigValue::Object(object) => Ok(object.handle()),
            other => Err(type_error(key, other, ConfigType::Object)),
        }
    }

    /// Borrow a nested config
    pub fn get_config(&self, key: &str) -> Result<&Config> {
        match self.lookup(key)? {
            ConfigValue::Object(ObjectValue::Config(config)) => Ok(config),
            ConfigValue::Object(ObjectValue::Foreign(_)) => Err(KvError::ConfigType(format!(
                "config entry '{}' is a foreign object, not a nested config",
                key
            ))),
            other => Err(type_error(key, other, ConfigType::Object)),
        }
    }

    fn lookup(&self, key: &str) -> Result<&ConfigValue> {
        self.entries
            .get(key)
            .ok_or_else(|| KvError::not_found(format!("config entry '{}'", key)))
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn entry_type(&self, key: &str) -> Option<ConfigType> {
        self.entries.get(key).map(ConfigValue::config_type)
    }

    /// Byte length of an entry (strings include the terminator)
    pub fn entry_size(&self, key: &str) -> Option<usize> {
        self.entries.get(key).map(ConfigValue::size)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn type_error(key: &str, found: &ConfigValue, wanted: ConfigType) -> KvError {
    KvError::ConfigType(format!(
        "config entry '{}' holds {}, cannot be read as {}",
        key,
        found.config_type(),
        wanted
    ))
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for Config
///
/// The first failed put is remembered and reported by [`ConfigBuilder::build`].
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    error: Option<KvError>,
}

impl ConfigBuilder {
    /// Set `path`, the backing file or directory of an engine
    pub fn path(self, path: impl AsRef<Path>) -> Self {
        match path.as_ref().to_str() {
            Some(path) => self.string("path", path),
            None => self.fail(KvError::InvalidArgument(
                "path is not valid UTF-8".to_string(),
            )),
        }
    }

    /// Set `size`, the engine capacity in bytes
    pub fn size(self, bytes: u64) -> Self {
        self.uint64("size", bytes)
    }

    pub fn string(mut self, key: &str, value: &str) -> Self {
        let result = self.config.put_string(key, value);
        self.record(result)
    }

    pub fn int64(mut self, key: &str, value: i64) -> Self {
        let result = self.config.put_int64(key, value);
        self.record(result)
    }

    pub fn uint64(mut self, key: &str, value: u64) -> Self {
        let result = self.config.put_uint64(key, value);
        self.record(result)
    }

    pub fn double(mut self, key: &str, value: f64) -> Self {
        let result = self.config.put_double(key, value);
        self.record(result)
    }

    pub fn data(mut self, key: &str, value: &[u8]) -> Self {
        let result = self.config.put_data(key, value);
        self.record(result)
    }

    /// Nest another config under `key`
    pub fn config(mut self, key: &str, nested: Config) -> Self {
        let result = self.config.put_config(key, nested);
        self.record(result)
    }

    pub fn build(self) -> Result<Config> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.config),
        }
    }

    fn record(self, result: Result<()>) -> Self {
        match result {
            Ok(()) => self,
            Err(err) => self.fail(err),
        }
    }

    fn fail(mut self, err: KvError) -> Self {
        self.error.get_or_insert(err);
        self
    }
}
