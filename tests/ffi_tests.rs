//! Tests for the C API
//!
//! These tests call the exported functions directly and verify:
//! - Status codes for success, absence and bad arguments
//! - The per-thread last-error message
//! - Config handles, object ownership and JSON import
//! - Buffered get-copy sizing rules
//! - Callback delivery through the opaque `arg` pointer

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use pmemkv::ffi::*;
use pmemkv::status::*;
use pmemkv::{Config, Db};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn errormsg() -> String {
    unsafe { CStr::from_ptr(pmemkv_errormsg()) }
        .to_string_lossy()
        .into_owned()
}

/// Open a vsmap over `dir` through the C API
fn open_vsmap(dir: &TempDir) -> *mut Db {
    let json = cstr(&format!(
        r#"{{"path":"{}","size":1048576}}"#,
        dir.path().display()
    ));
    unsafe {
        let cfg = pmemkv_config_new();
        assert_eq!(pmemkv_config_from_json(cfg, json.as_ptr()), PMEMKV_STATUS_OK);

        let mut db = ptr::null_mut();
        let engine = cstr("vsmap");
        assert_eq!(pmemkv_open(engine.as_ptr(), cfg, &mut db), PMEMKV_STATUS_OK);
        pmemkv_config_delete(cfg);
        assert!(!db.is_null());
        db
    }
}

/// Config carrying a path and size, enough to get past the factory's
/// argument checks
fn pool_config() -> *mut Config {
    let json = cstr(r#"{"path":"/nonexistent/db.pool","size":1048576}"#);
    unsafe {
        let cfg = pmemkv_config_new();
        assert_eq!(pmemkv_config_from_json(cfg, json.as_ptr()), PMEMKV_STATUS_OK);
        cfg
    }
}

unsafe fn put(db: *mut Db, key: &[u8], value: &[u8]) -> i32 {
    pmemkv_put(
        db,
        key.as_ptr() as *const c_char,
        key.len(),
        value.as_ptr() as *const c_char,
        value.len(),
    )
}

unsafe extern "C" fn collect_kv(
    key: *const c_char,
    keybytes: usize,
    value: *const c_char,
    valuebytes: usize,
    arg: *mut c_void,
) {
    let out = &mut *(arg as *mut Vec<(Vec<u8>, Vec<u8>)>);
    let key = std::slice::from_raw_parts(key as *const u8, keybytes);
    let value = std::slice::from_raw_parts(value as *const u8, valuebytes);
    out.push((key.to_vec(), value.to_vec()));
}

unsafe extern "C" fn collect_v(value: *const c_char, valuebytes: usize, arg: *mut c_void) {
    let out = &mut *(arg as *mut Vec<u8>);
    out.extend_from_slice(std::slice::from_raw_parts(value as *const u8, valuebytes));
}

// =============================================================================
// Status Codes
// =============================================================================

#[test]
fn test_status_values() {
    assert_eq!(PMEMKV_STATUS_OK, 0);
    assert_eq!(PMEMKV_STATUS_FAILED, -1);
    assert_eq!(PMEMKV_STATUS_NOT_FOUND, 1);
    assert_eq!(PMEMKV_STATUS_INVALID_ARGUMENT, 2);
    assert_eq!(PMEMKV_STATUS_CONFIG_PARSING_ERROR, 3);
    assert_eq!(PMEMKV_STATUS_CONFIG_TYPE_ERROR, 4);

    assert_eq!(Status::from_code(3), Some(Status::ConfigParsingError));
    assert_eq!(Status::from_code(42), None);
    assert_eq!(Status::NotFound.to_string(), "NOT_FOUND");
}

// =============================================================================
// Config Handles
// =============================================================================

#[test]
fn test_config_scalars() {
    unsafe {
        let cfg = pmemkv_config_new();
        let path = cstr("path");
        let size = cstr("size");
        let neg = cstr("neg");
        let ratio = cstr("ratio");
        let blob = cstr("blob");
        let value = cstr("/tmp/pool");

        assert_eq!(pmemkv_config_put_string(cfg, path.as_ptr(), value.as_ptr()), PMEMKV_STATUS_OK);
        assert_eq!(pmemkv_config_put_uint64(cfg, size.as_ptr(), 4096), PMEMKV_STATUS_OK);
        assert_eq!(pmemkv_config_put_int64(cfg, neg.as_ptr(), -1), PMEMKV_STATUS_OK);
        assert_eq!(pmemkv_config_put_double(cfg, ratio.as_ptr(), 2.5), PMEMKV_STATUS_OK);
        let data = [9u8, 8, 7];
        assert_eq!(
            pmemkv_config_put_data(cfg, blob.as_ptr(), data.as_ptr() as *const c_void, data.len()),
            PMEMKV_STATUS_OK
        );

        let mut s: *const c_char = ptr::null();
        assert_eq!(pmemkv_config_get_string(cfg, path.as_ptr(), &mut s), PMEMKV_STATUS_OK);
        assert_eq!(CStr::from_ptr(s).to_str().unwrap(), "/tmp/pool");

        let mut u = 0u64;
        assert_eq!(pmemkv_config_get_uint64(cfg, size.as_ptr(), &mut u), PMEMKV_STATUS_OK);
        assert_eq!(u, 4096);

        let mut i = 0i64;
        assert_eq!(pmemkv_config_get_int64(cfg, neg.as_ptr(), &mut i), PMEMKV_STATUS_OK);
        assert_eq!(i, -1);
        assert_eq!(
            pmemkv_config_get_uint64(cfg, neg.as_ptr(), &mut u),
            PMEMKV_STATUS_CONFIG_TYPE_ERROR
        );

        let mut d = 0f64;
        assert_eq!(pmemkv_config_get_double(cfg, ratio.as_ptr(), &mut d), PMEMKV_STATUS_OK);
        assert_eq!(d, 2.5);

        let mut bytes: *const c_void = ptr::null();
        let mut len = 0usize;
        assert_eq!(
            pmemkv_config_get_data(cfg, blob.as_ptr(), &mut bytes, &mut len),
            PMEMKV_STATUS_OK
        );
        assert_eq!(std::slice::from_raw_parts(bytes as *const u8, len), &data);

        // Either output may be omitted
        assert_eq!(
            pmemkv_config_get_data(cfg, blob.as_ptr(), ptr::null_mut(), &mut len),
            PMEMKV_STATUS_OK
        );

        let missing = cstr("missing");
        assert_eq!(
            pmemkv_config_get_int64(cfg, missing.as_ptr(), &mut i),
            PMEMKV_STATUS_NOT_FOUND
        );

        pmemkv_config_delete(cfg);
    }
}

#[test]
fn test_config_null_arguments() {
    unsafe {
        let key = cstr("k");
        let mut i = 0i64;

        assert_eq!(
            pmemkv_config_put_int64(ptr::null_mut(), key.as_ptr(), 1),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );
        assert_eq!(
            pmemkv_config_get_int64(ptr::null(), key.as_ptr(), &mut i),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );

        let cfg = pmemkv_config_new();
        assert_eq!(
            pmemkv_config_put_int64(cfg, ptr::null(), 1),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );
        assert_eq!(
            pmemkv_config_put_string(cfg, key.as_ptr(), ptr::null()),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );
        pmemkv_config_delete(cfg);

        // Deleting null is a no-op
        pmemkv_config_delete(ptr::null_mut());
    }
}

static DESTROYED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn count_destroy(object: *mut c_void) {
    drop(Box::from_raw(object as *mut u64));
    DESTROYED.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn test_config_object_destructor() {
    unsafe {
        let cfg = pmemkv_config_new();
        let key = cstr("obj");
        let object = Box::into_raw(Box::new(77u64)) as *mut c_void;

        assert_eq!(
            pmemkv_config_put_object(cfg, key.as_ptr(), object, Some(count_destroy)),
            PMEMKV_STATUS_OK
        );

        let mut out: *mut c_void = ptr::null_mut();
        assert_eq!(pmemkv_config_get_object(cfg, key.as_ptr(), &mut out), PMEMKV_STATUS_OK);
        assert_eq!(out, object);
        assert_eq!(*(out as *mut u64), 77);
        assert_eq!(DESTROYED.load(Ordering::SeqCst), 0);

        pmemkv_config_delete(cfg);
        assert_eq!(DESTROYED.load(Ordering::SeqCst), 1);
    }
}

static DUPLICATE_DESTROYED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn count_duplicate_destroy(object: *mut c_void) {
    drop(Box::from_raw(object as *mut u64));
    DUPLICATE_DESTROYED.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn test_config_duplicate_object_released_with_config() {
    unsafe {
        let cfg = pmemkv_config_new();
        let key = cstr("obj");
        let kept = Box::into_raw(Box::new(1u64)) as *mut c_void;
        let extra = Box::into_raw(Box::new(2u64)) as *mut c_void;

        assert_eq!(
            pmemkv_config_put_object(cfg, key.as_ptr(), kept, Some(count_duplicate_destroy)),
            PMEMKV_STATUS_OK
        );
        assert_eq!(
            pmemkv_config_put_object(cfg, key.as_ptr(), extra, Some(count_duplicate_destroy)),
            PMEMKV_STATUS_OK
        );

        // The second object is still alive and readable by its owner
        assert_eq!(DUPLICATE_DESTROYED.load(Ordering::SeqCst), 0);
        assert_eq!(*(extra as *mut u64), 2);

        let mut out: *mut c_void = ptr::null_mut();
        assert_eq!(pmemkv_config_get_object(cfg, key.as_ptr(), &mut out), PMEMKV_STATUS_OK);
        assert_eq!(out, kept);

        pmemkv_config_delete(cfg);
        assert_eq!(DUPLICATE_DESTROYED.load(Ordering::SeqCst), 2);
    }
}

#[test]
fn test_config_object_adopts_nested_config() {
    unsafe {
        let outer = pmemkv_config_new();
        let inner = pmemkv_config_new();
        let key = cstr("subengine_config");
        let size = cstr("size");

        assert_eq!(pmemkv_config_put_uint64(inner, size.as_ptr(), 64), PMEMKV_STATUS_OK);
        assert_eq!(
            pmemkv_config_put_object(
                outer,
                key.as_ptr(),
                inner as *mut c_void,
                Some(config_delete_as_destructor()),
            ),
            PMEMKV_STATUS_OK
        );

        let mut out: *mut c_void = ptr::null_mut();
        assert_eq!(pmemkv_config_get_object(outer, key.as_ptr(), &mut out), PMEMKV_STATUS_OK);
        assert_eq!(out, inner as *mut c_void);

        // The handle is still a usable config
        let mut u = 0u64;
        assert_eq!(
            pmemkv_config_get_uint64(out as *const Config, size.as_ptr(), &mut u),
            PMEMKV_STATUS_OK
        );
        assert_eq!(u, 64);

        let nested = (*outer).get_config("subengine_config").unwrap();
        assert_eq!(nested.get_uint64("size").unwrap(), 64);

        // Releases `inner` as well
        pmemkv_config_delete(outer);
    }
}

/// `pmemkv_config_delete` viewed as an object destructor, the way C callers
/// pass it
fn config_delete_as_destructor() -> pmemkv_config_destructor {
    let delete: unsafe extern "C" fn(*mut Config) = pmemkv_config_delete;
    unsafe {
        std::mem::transmute::<unsafe extern "C" fn(*mut Config), pmemkv_config_destructor>(delete)
    }
}

#[test]
fn test_config_from_json() {
    unsafe {
        let cfg = pmemkv_config_new();
        let json = cstr(r#"{"path":"/x","size":5,"sub":{"a":1}}"#);
        assert_eq!(pmemkv_config_from_json(cfg, json.as_ptr()), PMEMKV_STATUS_OK);

        let mut sub: *mut c_void = ptr::null_mut();
        let key = cstr("sub");
        assert_eq!(pmemkv_config_get_object(cfg, key.as_ptr(), &mut sub), PMEMKV_STATUS_OK);

        let mut a = 0i64;
        let a_key = cstr("a");
        assert_eq!(
            pmemkv_config_get_int64(sub as *const Config, a_key.as_ptr(), &mut a),
            PMEMKV_STATUS_OK
        );
        assert_eq!(a, 1);

        let bad = cstr(r#"{"list":[1]}"#);
        assert_eq!(
            pmemkv_config_from_json(cfg, bad.as_ptr()),
            PMEMKV_STATUS_CONFIG_PARSING_ERROR
        );
        assert!(errormsg().contains("Array"));

        let malformed = cstr("{");
        assert_eq!(
            pmemkv_config_from_json(cfg, malformed.as_ptr()),
            PMEMKV_STATUS_CONFIG_PARSING_ERROR
        );

        pmemkv_config_delete(cfg);
    }
}

// =============================================================================
// Open / Close
// =============================================================================

#[test]
fn test_open_failure_leaves_null_handle() {
    unsafe {
        let engine = cstr("nope");
        let mut db = 0x1 as *mut Db;
        assert_eq!(
            pmemkv_open(engine.as_ptr(), ptr::null(), &mut db),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );
        assert!(db.is_null());

        let cfg = pool_config();
        let mut db = 0x1 as *mut Db;
        assert_eq!(pmemkv_open(engine.as_ptr(), cfg, &mut db), PMEMKV_STATUS_FAILED);
        assert!(db.is_null());
        assert!(errormsg().contains("Unknown engine name"));

        let not_utf8 = CString::new(vec![0xffu8, 0xfe]).unwrap();
        assert_eq!(pmemkv_open(not_utf8.as_ptr(), cfg, &mut db), PMEMKV_STATUS_FAILED);
        assert_eq!(
            pmemkv_open(not_utf8.as_ptr(), ptr::null(), &mut db),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );
        pmemkv_config_delete(cfg);

        let engine = cstr("stree");
        let mut db = 0x1 as *mut Db;
        assert_eq!(
            pmemkv_open(engine.as_ptr(), ptr::null(), &mut db),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );
        assert!(db.is_null());

        assert_eq!(
            pmemkv_open(engine.as_ptr(), ptr::null(), ptr::null_mut()),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );

        // Closing null is a no-op
        pmemkv_close(ptr::null_mut());
    }
}

#[test]
fn test_open_blackhole_without_config() {
    unsafe {
        let engine = cstr("blackhole");
        let mut db = ptr::null_mut();
        assert_eq!(pmemkv_open(engine.as_ptr(), ptr::null(), &mut db), PMEMKV_STATUS_OK);

        assert_eq!(put(db, b"k", b"v"), PMEMKV_STATUS_OK);
        assert_eq!(pmemkv_exists(db, b"k".as_ptr() as *const c_char, 1), PMEMKV_STATUS_NOT_FOUND);
        assert_eq!(pmemkv_remove(db, b"k".as_ptr() as *const c_char, 1), PMEMKV_STATUS_OK);

        pmemkv_close(db);
    }
}

// =============================================================================
// Point Operations
// =============================================================================

#[test]
fn test_null_db_is_invalid_argument() {
    unsafe {
        let key = b"k";
        let mut cnt = 0usize;
        let db: *mut Db = ptr::null_mut();

        assert_eq!(put(db, key, b"v"), PMEMKV_STATUS_INVALID_ARGUMENT);
        assert_eq!(
            pmemkv_exists(db, key.as_ptr() as *const c_char, key.len()),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );
        assert_eq!(pmemkv_count_all(db, &mut cnt), PMEMKV_STATUS_INVALID_ARGUMENT);
        assert!(errormsg().contains("db is null"));
    }
}

#[test]
fn test_put_get_exists_remove() {
    let dir = TempDir::new().unwrap();
    let db = open_vsmap(&dir);

    unsafe {
        assert_eq!(put(db, b"key1", b"value1"), PMEMKV_STATUS_OK);
        assert_eq!(pmemkv_exists(db, b"key1".as_ptr() as *const c_char, 4), PMEMKV_STATUS_OK);

        let mut got = Vec::new();
        assert_eq!(
            pmemkv_get(
                db,
                b"key1".as_ptr() as *const c_char,
                4,
                Some(collect_v),
                &mut got as *mut Vec<u8> as *mut c_void,
            ),
            PMEMKV_STATUS_OK
        );
        assert_eq!(got, b"value1");

        assert_eq!(
            pmemkv_get(db, b"key1".as_ptr() as *const c_char, 4, None, ptr::null_mut()),
            PMEMKV_STATUS_INVALID_ARGUMENT
        );

        assert_eq!(pmemkv_remove(db, b"key1".as_ptr() as *const c_char, 4), PMEMKV_STATUS_OK);
        assert_eq!(
            pmemkv_remove(db, b"key1".as_ptr() as *const c_char, 4),
            PMEMKV_STATUS_NOT_FOUND
        );
        assert_eq!(
            pmemkv_get(
                db,
                b"key1".as_ptr() as *const c_char,
                4,
                Some(collect_v),
                &mut got as *mut Vec<u8> as *mut c_void,
            ),
            PMEMKV_STATUS_NOT_FOUND
        );

        pmemkv_close(db);
    }
}

#[test]
fn test_get_copy_sizing() {
    let dir = TempDir::new().unwrap();
    let db = open_vsmap(&dir);
    let key = b"k";
    let k = key.as_ptr() as *const c_char;

    unsafe {
        assert_eq!(put(db, key, b"abcd"), PMEMKV_STATUS_OK);

        // A buffer exactly as long as the value has no room for the terminator
        let mut exact = [0x55 as c_char; 4];
        let mut size = 0usize;
        assert_eq!(
            pmemkv_get_copy(db, k, 1, exact.as_mut_ptr(), exact.len(), &mut size),
            PMEMKV_STATUS_FAILED
        );
        assert_eq!(size, 4);
        assert_eq!(exact, [0; 4]);

        let mut roomy = [0x55 as c_char; 8];
        size = 0;
        assert_eq!(
            pmemkv_get_copy(db, k, 1, roomy.as_mut_ptr(), roomy.len(), &mut size),
            PMEMKV_STATUS_OK
        );
        assert_eq!(size, 4);
        assert_eq!(CStr::from_ptr(roomy.as_ptr()).to_bytes(), b"abcd");
        assert!(roomy[4..].iter().all(|&b| b == 0));

        // Size probe without a buffer or without a size slot
        size = 0;
        assert_eq!(
            pmemkv_get_copy(db, k, 1, ptr::null_mut(), 0, &mut size),
            PMEMKV_STATUS_FAILED
        );
        assert_eq!(size, 4);
        assert_eq!(
            pmemkv_get_copy(db, k, 1, roomy.as_mut_ptr(), roomy.len(), ptr::null_mut()),
            PMEMKV_STATUS_OK
        );

        let missing = b"zz";
        size = 123;
        assert_eq!(
            pmemkv_get_copy(
                db,
                missing.as_ptr() as *const c_char,
                2,
                roomy.as_mut_ptr(),
                roomy.len(),
                &mut size
            ),
            PMEMKV_STATUS_NOT_FOUND
        );
        assert_eq!(size, 123);

        pmemkv_close(db);
    }
}

// =============================================================================
// Range Operations
// =============================================================================

#[test]
fn test_counts_and_iteration() {
    let dir = TempDir::new().unwrap();
    let db = open_vsmap(&dir);

    unsafe {
        for key in [b"a", b"b", b"c", b"d"] {
            assert_eq!(put(db, key, b"v"), PMEMKV_STATUS_OK);
        }

        let mut cnt = 0usize;
        assert_eq!(pmemkv_count_all(db, &mut cnt), PMEMKV_STATUS_OK);
        assert_eq!(cnt, 4);
        assert_eq!(pmemkv_count_above(db, b"b".as_ptr() as *const c_char, 1, &mut cnt), PMEMKV_STATUS_OK);
        assert_eq!(cnt, 2);
        assert_eq!(pmemkv_count_below(db, b"b".as_ptr() as *const c_char, 1, &mut cnt), PMEMKV_STATUS_OK);
        assert_eq!(cnt, 1);
        assert_eq!(
            pmemkv_count_between(
                db,
                b"d".as_ptr() as *const c_char,
                1,
                b"a".as_ptr() as *const c_char,
                1,
                &mut cnt
            ),
            PMEMKV_STATUS_OK
        );
        assert_eq!(cnt, 0);
        assert_eq!(pmemkv_count_all(db, ptr::null_mut()), PMEMKV_STATUS_INVALID_ARGUMENT);

        let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        let arg = &mut pairs as *mut _ as *mut c_void;
        assert_eq!(pmemkv_get_all(db, Some(collect_kv), arg), PMEMKV_STATUS_OK);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], (b"a".to_vec(), b"v".to_vec()));

        pairs.clear();
        assert_eq!(
            pmemkv_get_above(db, b"c".as_ptr() as *const c_char, 1, Some(collect_kv), arg),
            PMEMKV_STATUS_OK
        );
        assert_eq!(pairs, vec![(b"d".to_vec(), b"v".to_vec())]);

        pairs.clear();
        assert_eq!(
            pmemkv_get_below(db, b"b".as_ptr() as *const c_char, 1, Some(collect_kv), arg),
            PMEMKV_STATUS_OK
        );
        assert_eq!(pairs, vec![(b"a".to_vec(), b"v".to_vec())]);

        pairs.clear();
        assert_eq!(
            pmemkv_get_between(
                db,
                b"a".as_ptr() as *const c_char,
                1,
                b"d".as_ptr() as *const c_char,
                1,
                Some(collect_kv),
                arg
            ),
            PMEMKV_STATUS_OK
        );
        let keys: Vec<Vec<u8>> = pairs.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);

        assert_eq!(pmemkv_get_all(db, None, arg), PMEMKV_STATUS_INVALID_ARGUMENT);

        pmemkv_close(db);
    }
}

// =============================================================================
// Last-Error Message
// =============================================================================

#[test]
fn test_errormsg_is_per_thread() {
    unsafe {
        let engine = cstr("nope");
        let cfg = pool_config();
        let mut db = ptr::null_mut();
        assert_eq!(pmemkv_open(engine.as_ptr(), cfg, &mut db), PMEMKV_STATUS_FAILED);
        pmemkv_config_delete(cfg);
    }
    assert!(errormsg().contains("Unknown engine name"));
    assert_eq!(last_error_message(), errormsg());

    let other = thread::spawn(errormsg).join().unwrap();
    assert!(other.is_empty());
}

#[test]
fn test_errormsg_survives_success_and_not_found() {
    let dir = TempDir::new().unwrap();
    let db = open_vsmap(&dir);

    unsafe {
        let mut cnt = 0usize;
        assert_eq!(pmemkv_count_all(ptr::null_mut(), &mut cnt), PMEMKV_STATUS_INVALID_ARGUMENT);
        let message = errormsg();
        assert!(!message.is_empty());

        assert_eq!(pmemkv_count_all(db, &mut cnt), PMEMKV_STATUS_OK);
        assert_eq!(pmemkv_exists(db, b"x".as_ptr() as *const c_char, 1), PMEMKV_STATUS_NOT_FOUND);
        assert_eq!(errormsg(), message);

        pmemkv_close(db);
    }
}
