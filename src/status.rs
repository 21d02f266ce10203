//! Status codes
//!
//! Every operation that crosses the C boundary returns one of these values.
//! Callers branch on the exact integer, so the discriminants are fixed.

use std::fmt;
use std::os::raw::c_int;

/// Operation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    Failed = -1,
    NotFound = 1,
    InvalidArgument = 2,
    ConfigParsingError = 3,
    ConfigTypeError = 4,
}

pub const PMEMKV_STATUS_OK: c_int = Status::Ok as c_int;
pub const PMEMKV_STATUS_FAILED: c_int = Status::Failed as c_int;
pub const PMEMKV_STATUS_NOT_FOUND: c_int = Status::NotFound as c_int;
pub const PMEMKV_STATUS_INVALID_ARGUMENT: c_int = Status::InvalidArgument as c_int;
pub const PMEMKV_STATUS_CONFIG_PARSING_ERROR: c_int = Status::ConfigParsingError as c_int;
pub const PMEMKV_STATUS_CONFIG_TYPE_ERROR: c_int = Status::ConfigTypeError as c_int;

impl Status {
    /// Raw value handed to C callers
    pub fn code(self) -> c_int {
        self as c_int
    }

    /// Inverse of [`Status::code`]; unknown values yield `None`
    pub fn from_code(code: c_int) -> Option<Self> {
        match code {
            PMEMKV_STATUS_OK => Some(Status::Ok),
            PMEMKV_STATUS_FAILED => Some(Status::Failed),
            PMEMKV_STATUS_NOT_FOUND => Some(Status::NotFound),
            PMEMKV_STATUS_INVALID_ARGUMENT => Some(Status::InvalidArgument),
            PMEMKV_STATUS_CONFIG_PARSING_ERROR => Some(Status::ConfigParsingError),
            PMEMKV_STATUS_CONFIG_TYPE_ERROR => Some(Status::ConfigTypeError),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "OK",
            Status::Failed => "FAILED",
            Status::NotFound => "NOT_FOUND",
            Status::InvalidArgument => "INVALID_ARGUMENT",
            Status::ConfigParsingError => "CONFIG_PARSING_ERROR",
            Status::ConfigTypeError => "CONFIG_TYPE_ERROR",
        };
        f.write_str(name)
    }
}
