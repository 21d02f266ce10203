//! C API
//!
//! Stable C ABI over [`Config`] and [`Db`].
//!
//! Every entry point:
//! 1. rejects null handles and arguments with `PMEMKV_STATUS_INVALID_ARGUMENT`
//! 2. runs the operation
//! 3. turns any error, or panic, into a status code and records a message
//!    readable through [`pmemkv_errormsg`]
//!
//! Handles are opaque to C. A `pmemkv_config*` is a boxed [`Config`] and a
//! `pmemkv_db*` is a boxed [`Db`].

mod config;
mod db;
mod errormsg;

use std::any::Any;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::slice;

use crate::config::Config;
use crate::db::Db;
use crate::error::{KvError, Result};
use crate::status::{Status, PMEMKV_STATUS_FAILED};

pub use config::*;
pub use db::*;
pub use errormsg::{last_error_message, pmemkv_errormsg};

/// Opaque configuration handle
#[allow(non_camel_case_types)]
pub type pmemkv_config = Config;

/// Opaque engine handle
#[allow(non_camel_case_types)]
pub type pmemkv_db = Db;

// =============================================================================
// Status Translation
// =============================================================================

/// Run `op`, mapping its outcome to a status code
///
/// Errors other than "not found" and all panics leave a message in the
/// calling thread's last-error slot.
pub(crate) fn guard<F>(operation: &'static str, op: F) -> c_int
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(())) => Status::Ok.code(),
        Ok(Err(e)) => {
            if !matches!(e, KvError::NotFound(_)) {
                tracing::error!(operation, error = %e, "operation failed");
                errormsg::set_last_error(&e.to_string());
            }
            e.status().code()
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(operation, panic = %message, "operation panicked");
            errormsg::set_last_error(&message);
            PMEMKV_STATUS_FAILED
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("Unspecified failure: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("Unspecified failure: {}", s)
    } else {
        "Unspecified failure".to_string()
    }
}

// =============================================================================
// Argument Conversion
// =============================================================================

fn invalid(what: &str) -> KvError {
    KvError::InvalidArgument(format!("{} is null", what))
}

/// # Safety
/// `config` must be null or a live handle from `pmemkv_config_new`.
unsafe fn config_ref<'a>(config: *const Config) -> Result<&'a Config> {
    config.as_ref().ok_or_else(|| invalid("config"))
}

/// # Safety
/// `config` must be null or a live handle from `pmemkv_config_new`.
unsafe fn config_mut<'a>(config: *mut Config) -> Result<&'a mut Config> {
    config.as_mut().ok_or_else(|| invalid("config"))
}

/// # Safety
/// `db` must be null or a live handle from `pmemkv_open`.
unsafe fn db_ref<'a>(db: *const Db) -> Result<&'a Db> {
    db.as_ref().ok_or_else(|| invalid("db"))
}

/// # Safety
/// `out` must be null or valid for writes.
unsafe fn out_mut<'a, T>(out: *mut T, what: &str) -> Result<&'a mut T> {
    out.as_mut().ok_or_else(|| invalid(what))
}

/// # Safety
/// `s` must be null or a NUL-terminated string.
unsafe fn c_str<'a>(s: *const c_char, what: &str) -> Result<&'a CStr> {
    if s.is_null() {
        return Err(invalid(what));
    }
    Ok(CStr::from_ptr(s))
}

/// Config keys are UTF-8 strings
///
/// # Safety
/// `key` must be null or a NUL-terminated string.
unsafe fn config_key<'a>(key: *const c_char) -> Result<&'a str> {
    c_str(key, "key")?
        .to_str()
        .map_err(|_| KvError::InvalidArgument("key is not valid UTF-8".to_string()))
}

/// # Safety
/// `ptr` must be null or valid for `len` bytes of reads.
unsafe fn bytes<'a>(ptr: *const c_char, len: usize, what: &str) -> Result<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(invalid(what));
    }
    Ok(slice::from_raw_parts(ptr as *const u8, len))
}
