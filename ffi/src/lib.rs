//! C-ABI wrapper around `exchange-core`.
//!
//! # Overview
//! Exposes client construction and the blocking `execute` call through
//! `extern "C"` functions so hosts without a Rust toolchain can call the
//! data-exchange endpoint and inspect classified failures.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A single `FfiCallResult` envelope carries either the response body or
//!   an `FfiErrorCode` plus message.
//! - The C caller owns all returned pointers and must call the matching
//!   `exchange_*_free` / `exchange_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use exchange_core::{ExchangeClient, ExchangeError};

use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client. Non-positive timeouts fall back to 120000 ms.
///
/// Returns null only if an internal panic occurs.
/// The caller must free the returned pointer with `exchange_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn exchange_client_new(
    connect_timeout_ms: i64,
    read_timeout_ms: i64,
) -> *mut FfiExchangeClient {
    catch_unwind(|| {
        let client = ExchangeClient::new(connect_timeout_ms, read_timeout_ms);
        Box::into_raw(Box::new(FfiExchangeClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `exchange_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn exchange_client_free(client: *mut FfiExchangeClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

/// Borrow a C string argument as `&str`. Null reads as empty, which the
/// client rejects as a missing argument.
fn str_arg<'a>(s: *const c_char, name: &str) -> Result<&'a str, ExchangeError> {
    if s.is_null() {
        return Ok("");
    }
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map_err(|_| ExchangeError::InvalidArgument(format!("{name} is not valid UTF-8")))
}

/// Issue one GET or POST call. Blocks until the call completes or times out.
///
/// Returns `error_code = NullArg` if `client` is null. A null or empty `url`
/// or `method` yields `InvalidArgument`, as from the Rust API; so does one
/// that is not valid UTF-8.
/// The caller must free the result with `exchange_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn exchange_execute(
    client: *const FfiExchangeClient,
    url: *const c_char,
    method: *const c_char,
) -> *mut FfiCallResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiCallResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let (url, method) = match (str_arg(url, "url"), str_arg(method, "method")) {
            (Ok(url), Ok(method)) => (url, method),
            (Err(e), _) | (_, Err(e)) => return FfiCallResult::from_error(e),
        };
        match client.inner.execute(url, method) {
            Ok(body) => FfiCallResult::ok(body),
            Err(e) => FfiCallResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiCallResult::panic("panic in exchange_execute"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiCallResult` returned by `exchange_execute`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn exchange_free_result(result: *mut FfiCallResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.message.is_null() {
            drop(unsafe { CString::from_raw(result.message) });
        }
        if !result.body.is_null() {
            drop(unsafe { CString::from_raw(result.body) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn exchange_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
