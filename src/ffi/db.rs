//! C API: engine handle

use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use super::{bytes, c_str, config_ref, db_ref, guard, out_mut};
use crate::config::Config;
use crate::db::Db;
use crate::error::{KvError, Result};

/// Receives one key/value pair during iteration
#[allow(non_camel_case_types)]
pub type pmemkv_get_kv_callback = unsafe extern "C" fn(
    key: *const c_char,
    keybytes: usize,
    value: *const c_char,
    valuebytes: usize,
    arg: *mut c_void,
);

/// Receives the value of a point lookup
#[allow(non_camel_case_types)]
pub type pmemkv_get_v_callback =
    unsafe extern "C" fn(value: *const c_char, valuebytes: usize, arg: *mut c_void);

fn require<T>(callback: Option<T>) -> Result<T> {
    callback.ok_or_else(|| KvError::InvalidArgument("callback is null".to_string()))
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Open engine `engine` configured by `config`
///
/// On success `*db` receives a handle to release with `pmemkv_close`; on any
/// failure `*db` is set to null. `config` may be null for engines that need
/// no configuration and stays owned by the caller.
///
/// # Safety
/// * `engine` must be a NUL-terminated string
/// * `config` must be null or a valid config handle
/// * `db` must be valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_open(
    engine: *const c_char,
    config: *const Config,
    db: *mut *mut Db,
) -> c_int {
    guard("pmemkv_open", || {
        let out = out_mut(db, "db")?;
        *out = ptr::null_mut();

        // A non UTF-8 name matches no variant and is reported by the factory
        let engine = c_str(engine, "engine")?.to_string_lossy();
        let config = if config.is_null() {
            None
        } else {
            Some(config_ref(config)?)
        };

        let opened = Db::open(&engine, config)?;
        *out = Box::into_raw(Box::new(opened));
        Ok(())
    })
}

/// Close a handle; null is ignored
///
/// # Safety
/// * `db` must be null or a handle from `pmemkv_open` not yet closed
#[no_mangle]
pub unsafe extern "C" fn pmemkv_close(db: *mut Db) {
    if db.is_null() {
        return;
    }
    guard("pmemkv_close", || Box::from_raw(db).close());
}

// =============================================================================
// Point Operations
// =============================================================================

/// `PMEMKV_STATUS_OK` if `k` exists, `PMEMKV_STATUS_NOT_FOUND` otherwise
///
/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_exists(db: *mut Db, k: *const c_char, kb: usize) -> c_int {
    guard("pmemkv_exists", || {
        let db = db_ref(db)?;
        if db.exists(bytes(k, kb, "key")?)? {
            Ok(())
        } else {
            Err(KvError::not_found("key"))
        }
    })
}

/// Pass the value of `k` to `c`
///
/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_get(
    db: *mut Db,
    k: *const c_char,
    kb: usize,
    c: Option<pmemkv_get_v_callback>,
    arg: *mut c_void,
) -> c_int {
    guard("pmemkv_get", || {
        let db = db_ref(db)?;
        let key = bytes(k, kb, "key")?;
        let callback = require(c)?;
        db.get_with(key, &mut |value| {
            callback(value.as_ptr() as *const c_char, value.len(), arg)
        })
    })
}

/// Copy the value of `k` into `buffer`
///
/// `buffer` is zeroed first. When `k` exists its value length is stored in
/// `*value_size` (if given) and the value is copied only if it is strictly
/// shorter than `buffer_size`; otherwise `PMEMKV_STATUS_FAILED` is returned
/// with nothing copied.
///
/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes
/// * `buffer` must be null or valid for `buffer_size` bytes of writes
/// * `value_size` must be null or valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_get_copy(
    db: *mut Db,
    k: *const c_char,
    kb: usize,
    buffer: *mut c_char,
    buffer_size: usize,
    value_size: *mut usize,
) -> c_int {
    guard("pmemkv_get_copy", || {
        let db = db_ref(db)?;
        let key = bytes(k, kb, "key")?;
        let buffer = if buffer.is_null() {
            None
        } else {
            Some(std::slice::from_raw_parts_mut(buffer as *mut u8, buffer_size))
        };
        db.copy_value(key, buffer_size, buffer, value_size.as_mut())
    })
}

/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes and `v` for `vb` bytes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_put(
    db: *mut Db,
    k: *const c_char,
    kb: usize,
    v: *const c_char,
    vb: usize,
) -> c_int {
    guard("pmemkv_put", || {
        db_ref(db)?.put(bytes(k, kb, "key")?, bytes(v, vb, "value")?)
    })
}

/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_remove(db: *mut Db, k: *const c_char, kb: usize) -> c_int {
    guard("pmemkv_remove", || db_ref(db)?.remove(bytes(k, kb, "key")?))
}

// =============================================================================
// Counting
// =============================================================================

/// # Safety
/// * `db` must be a valid handle
/// * `cnt` must be valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_count_all(db: *mut Db, cnt: *mut usize) -> c_int {
    guard("pmemkv_count_all", || {
        let count = db_ref(db)?.count_all()?;
        *out_mut(cnt, "cnt")? = count;
        Ok(())
    })
}

/// Count keys strictly greater than `k`
///
/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes
/// * `cnt` must be valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_count_above(
    db: *mut Db,
    k: *const c_char,
    kb: usize,
    cnt: *mut usize,
) -> c_int {
    guard("pmemkv_count_above", || {
        let count = db_ref(db)?.count_above(bytes(k, kb, "key")?)?;
        *out_mut(cnt, "cnt")? = count;
        Ok(())
    })
}

/// Count keys strictly less than `k`
///
/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes
/// * `cnt` must be valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_count_below(
    db: *mut Db,
    k: *const c_char,
    kb: usize,
    cnt: *mut usize,
) -> c_int {
    guard("pmemkv_count_below", || {
        let count = db_ref(db)?.count_below(bytes(k, kb, "key")?)?;
        *out_mut(cnt, "cnt")? = count;
        Ok(())
    })
}

/// Count keys strictly between `k1` and `k2`
///
/// # Safety
/// * `db` must be a valid handle
/// * `k1` must be valid for `kb1` bytes and `k2` for `kb2` bytes
/// * `cnt` must be valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_count_between(
    db: *mut Db,
    k1: *const c_char,
    kb1: usize,
    k2: *const c_char,
    kb2: usize,
    cnt: *mut usize,
) -> c_int {
    guard("pmemkv_count_between", || {
        let count = db_ref(db)?.count_between(bytes(k1, kb1, "key")?, bytes(k2, kb2, "key")?)?;
        *out_mut(cnt, "cnt")? = count;
        Ok(())
    })
}

// =============================================================================
// Iteration
// =============================================================================

/// Adapt a C callback into a key/value sink
fn forward(callback: pmemkv_get_kv_callback, arg: *mut c_void) -> impl FnMut(&[u8], &[u8]) {
    move |key: &[u8], value: &[u8]| unsafe {
        callback(
            key.as_ptr() as *const c_char,
            key.len(),
            value.as_ptr() as *const c_char,
            value.len(),
            arg,
        )
    }
}

/// # Safety
/// * `db` must be a valid handle
#[no_mangle]
pub unsafe extern "C" fn pmemkv_get_all(
    db: *mut Db,
    c: Option<pmemkv_get_kv_callback>,
    arg: *mut c_void,
) -> c_int {
    guard("pmemkv_get_all", || {
        let db = db_ref(db)?;
        let mut sink = forward(require(c)?, arg);
        db.get_all(&mut sink)
    })
}

/// Visit keys strictly greater than `k`, ascending
///
/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_get_above(
    db: *mut Db,
    k: *const c_char,
    kb: usize,
    c: Option<pmemkv_get_kv_callback>,
    arg: *mut c_void,
) -> c_int {
    guard("pmemkv_get_above", || {
        let db = db_ref(db)?;
        let key = bytes(k, kb, "key")?;
        let mut sink = forward(require(c)?, arg);
        db.get_above(key, &mut sink)
    })
}

/// Visit keys strictly less than `k`, ascending
///
/// # Safety
/// * `db` must be a valid handle
/// * `k` must be valid for `kb` bytes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_get_below(
    db: *mut Db,
    k: *const c_char,
    kb: usize,
    c: Option<pmemkv_get_kv_callback>,
    arg: *mut c_void,
) -> c_int {
    guard("pmemkv_get_below", || {
        let db = db_ref(db)?;
        let key = bytes(k, kb, "key")?;
        let mut sink = forward(require(c)?, arg);
        db.get_below(key, &mut sink)
    })
}

/// Visit keys strictly between `k1` and `k2`, ascending
///
/// # Safety
/// * `db` must be a valid handle
/// * `k1` must be valid for `kb1` bytes and `k2` for `kb2` bytes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_get_between(
    db: *mut Db,
    k1: *const c_char,
    kb1: usize,
    k2: *const c_char,
    kb2: usize,
    c: Option<pmemkv_get_kv_callback>,
    arg: *mut c_void,
) -> c_int {
    guard("pmemkv_get_between", || {
        let db = db_ref(db)?;
        let lower = bytes(k1, kb1, "key")?;
        let upper = bytes(k2, kb2, "key")?;
        let mut sink = forward(require(c)?, arg);
        db.get_between(lower, upper, &mut sink)
    })
}
