//! Last-error slot
//!
//! Each thread keeps the message of its most recent failing call. The slot
//! is overwritten by the next failure on the same thread and is never
//! cleared by a successful call.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn set_last_error(message: &str) {
    // Interior NULs would truncate the C view of the message
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Message of the most recent failing call on this thread
pub fn last_error_message() -> String {
    LAST_ERROR.with(|slot| slot.borrow().to_string_lossy().into_owned())
}

/// Message of the most recent failing call on the calling thread
///
/// The returned string is owned by the library and stays valid until the
/// next failing call on the same thread.
#[no_mangle]
pub extern "C" fn pmemkv_errormsg() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ptr())
}
