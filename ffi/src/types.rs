//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! A call produces one heap-allocated `FfiCallResult`. On success `body`
//! holds the response text; on failure `error_code` names the failure kind
//! and `message` holds the caller-visible message. Strings never contain
//! interior NUL bytes: any NUL in a response body is dropped on conversion.

use std::ffi::CString;
use std::os::raw::c_char;

use exchange_core::{ErrorKind, ExchangeClient, ExchangeError};

/// Opaque handle to an `ExchangeClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiExchangeClient {
    pub(crate) inner: ExchangeClient,
}

/// Outcome codes returned in `FfiCallResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidArgument = 1,
    ConnectionSetup = 2,
    Unauthorized = 3,
    RequestLimitExceeded = 4,
    NotInWhiteList = 5,
    Remote = 6,
    ResponseParse = 7,
    ResourceCleanup = 8,
    NullArg = 9,
    Panic = 10,
}

impl From<ErrorKind> for FfiErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidArgument => FfiErrorCode::InvalidArgument,
            ErrorKind::ConnectionSetup => FfiErrorCode::ConnectionSetup,
            ErrorKind::Unauthorized => FfiErrorCode::Unauthorized,
            ErrorKind::RequestLimitExceeded => FfiErrorCode::RequestLimitExceeded,
            ErrorKind::NotInWhiteList => FfiErrorCode::NotInWhiteList,
            ErrorKind::Remote => FfiErrorCode::Remote,
            ErrorKind::ResponseParse => FfiErrorCode::ResponseParse,
            ErrorKind::ResourceCleanup => FfiErrorCode::ResourceCleanup,
        }
    }
}

/// Result envelope for `exchange_execute`.
///
/// On success `error_code` is `Ok`, `message` is null and `body` points to
/// the response text. On failure `body` is null, `message` is a C string
/// (possibly empty) and `http_status` is set for remote failures, else 0.
#[repr(C)]
pub struct FfiCallResult {
    pub error_code: FfiErrorCode,
    pub message: *mut c_char,
    pub http_status: u16,
    pub body: *mut c_char,
}

impl FfiCallResult {
    pub(crate) fn ok(body: String) -> *mut Self {
        Box::into_raw(Box::new(FfiCallResult {
            error_code: FfiErrorCode::Ok,
            message: std::ptr::null_mut(),
            http_status: 0,
            body: into_c_string(body),
        }))
    }

    pub(crate) fn from_error(err: ExchangeError) -> *mut Self {
        Box::into_raw(Box::new(FfiCallResult {
            error_code: err.kind().into(),
            message: into_c_string(err.to_string()),
            http_status: err.http_status().unwrap_or(0),
            body: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg.to_string())
    }

    fn failure(error_code: FfiErrorCode, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiCallResult {
            error_code,
            message: into_c_string(msg),
            http_status: 0,
            body: std::ptr::null_mut(),
        }))
    }
}

/// Hand ownership of `s` to C, dropping interior NUL bytes.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let c = CString::new(s).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    c.into_raw()
}
