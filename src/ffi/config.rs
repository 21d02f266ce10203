//! C API: configuration

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};

use super::{bytes, c_str, config_key, config_mut, config_ref, guard, out_mut};
use crate::config::{Config, Destructor};
use crate::error::KvError;
use crate::json::import_json;

/// Destructor registered with an OBJECT entry
#[allow(non_camel_case_types)]
pub type pmemkv_config_destructor = unsafe extern "C" fn(object: *mut c_void);

/// Create an empty config
///
/// Release it with `pmemkv_config_delete`, unless ownership is handed to
/// another config through `pmemkv_config_put_object`.
#[no_mangle]
pub extern "C" fn pmemkv_config_new() -> *mut Config {
    Box::into_raw(Box::new(Config::new()))
}

/// Destroy a config and every object it owns
///
/// # Safety
/// * `config` must be null or a handle from `pmemkv_config_new` not yet
///   deleted or handed to another config
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_delete(config: *mut Config) {
    if config.is_null() {
        return;
    }
    guard("pmemkv_config_delete", || {
        drop(Box::from_raw(config));
        Ok(())
    });
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` and `value` must be NUL-terminated strings
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_put_string(
    config: *mut Config,
    key: *const c_char,
    value: *const c_char,
) -> c_int {
    guard("pmemkv_config_put_string", || {
        let config = config_mut(config)?;
        let key = config_key(key)?;
        let value = c_str(value, "value")?;
        config.put_c_string(key, value)
    })
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_put_int64(
    config: *mut Config,
    key: *const c_char,
    value: i64,
) -> c_int {
    guard("pmemkv_config_put_int64", || {
        config_mut(config)?.put_int64(config_key(key)?, value)
    })
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_put_uint64(
    config: *mut Config,
    key: *const c_char,
    value: u64,
) -> c_int {
    guard("pmemkv_config_put_uint64", || {
        config_mut(config)?.put_uint64(config_key(key)?, value)
    })
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_put_double(
    config: *mut Config,
    key: *const c_char,
    value: f64,
) -> c_int {
    guard("pmemkv_config_put_double", || {
        config_mut(config)?.put_double(config_key(key)?, value)
    })
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
/// * `value` must be valid for `value_size` bytes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_put_data(
    config: *mut Config,
    key: *const c_char,
    value: *const c_void,
    value_size: usize,
) -> c_int {
    guard("pmemkv_config_put_data", || {
        let config = config_mut(config)?;
        let key = config_key(key)?;
        let value = bytes(value as *const c_char, value_size, "value")?;
        config.put_data(key, value)
    })
}

/// Store an object and hand its ownership to `config`
///
/// `destructor`, if not null, is called with `value` once, when `config` is
/// deleted. Passing `pmemkv_config_delete` as the destructor nests `value`
/// (a config handle) inside `config`.
///
/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
/// * if `destructor` is `pmemkv_config_delete`, `value` must be a config
///   handle that is not owned elsewhere
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_put_object(
    config: *mut Config,
    key: *const c_char,
    value: *mut c_void,
    destructor: Option<pmemkv_config_destructor>,
) -> c_int {
    guard("pmemkv_config_put_object", || {
        let config = config_mut(config)?;
        let key = config_key(key)?;

        match destructor {
            Some(destroy) if !value.is_null() && is_config_delete(destroy) => {
                config.put_boxed_config(key, Box::from_raw(value as *mut Config))
            }
            Some(destroy) => {
                let destructor: Destructor = Box::new(move |object| destroy(object));
                config.put_object(key, value, Some(destructor))
            }
            None => config.put_object(key, value, None),
        }
    })
}

fn is_config_delete(destroy: pmemkv_config_destructor) -> bool {
    let config_delete: unsafe extern "C" fn(*mut Config) = pmemkv_config_delete;
    destroy as usize == config_delete as usize
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
/// * `value` must be valid for writes; the string written there lives as
///   long as `config`
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_get_string(
    config: *const Config,
    key: *const c_char,
    value: *mut *const c_char,
) -> c_int {
    guard("pmemkv_config_get_string", || {
        let found: &CStr = config_ref(config)?.get_c_string(config_key(key)?)?;
        *out_mut(value, "value")? = found.as_ptr();
        Ok(())
    })
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
/// * `value` must be valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_get_int64(
    config: *const Config,
    key: *const c_char,
    value: *mut i64,
) -> c_int {
    guard("pmemkv_config_get_int64", || {
        let found = config_ref(config)?.get_int64(config_key(key)?)?;
        *out_mut(value, "value")? = found;
        Ok(())
    })
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
/// * `value` must be valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_get_uint64(
    config: *const Config,
    key: *const c_char,
    value: *mut u64,
) -> c_int {
    guard("pmemkv_config_get_uint64", || {
        let found = config_ref(config)?.get_uint64(config_key(key)?)?;
        *out_mut(value, "value")? = found;
        Ok(())
    })
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
/// * `value` must be valid for writes
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_get_double(
    config: *const Config,
    key: *const c_char,
    value: *mut f64,
) -> c_int {
    guard("pmemkv_config_get_double", || {
        let found = config_ref(config)?.get_double(config_key(key)?)?;
        *out_mut(value, "value")? = found;
        Ok(())
    })
}

/// `value` and `value_size` are each optional
///
/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
/// * `value` and `value_size` must each be null or valid for writes; the
///   bytes written to `value` live as long as `config`
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_get_data(
    config: *const Config,
    key: *const c_char,
    value: *mut *const c_void,
    value_size: *mut usize,
) -> c_int {
    guard("pmemkv_config_get_data", || {
        let found = config_ref(config)?.get_data(config_key(key)?)?;
        if let Some(out) = value.as_mut() {
            *out = found.as_ptr() as *const c_void;
        }
        if let Some(out) = value_size.as_mut() {
            *out = found.len();
        }
        Ok(())
    })
}

/// # Safety
/// * `config` must be a valid handle
/// * `key` must be a NUL-terminated string
/// * `value` must be valid for writes; the object stays owned by `config`
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_get_object(
    config: *const Config,
    key: *const c_char,
    value: *mut *mut c_void,
) -> c_int {
    guard("pmemkv_config_get_object", || {
        let found = config_ref(config)?.get_object(config_key(key)?)?;
        *out_mut(value, "value")? = found;
        Ok(())
    })
}

/// Import the members of a JSON object into `config`
///
/// # Safety
/// * `config` must be a valid handle
/// * `json` must be a NUL-terminated string
#[no_mangle]
pub unsafe extern "C" fn pmemkv_config_from_json(config: *mut Config, json: *const c_char) -> c_int {
    guard("pmemkv_config_from_json", || {
        let config = config_mut(config)?;
        let json = c_str(json, "json")?
            .to_str()
            .map_err(|_| KvError::ConfigParsing("JSON is not valid UTF-8".to_string()))?;
        import_json(config, json)
    })
}
