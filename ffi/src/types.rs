//! Handle and string helpers for the FFI boundary.
//!
//! # Design
//! Everything crossing the boundary is a NUL-terminated UTF-8 string holding
//! JSON, so the PHP side only needs `json_decode`. Strings we hand out are
//! allocated with `CString::into_raw` and must come back through
//! `grautic_string_free`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use grautic_core::{FeedProcessor, UreqTransport};
use serde::Serialize;
use serde_json::json;

/// Opaque handle to a connected `FeedProcessor`. C callers receive a pointer
/// to this and pass it back into every FFI function.
pub struct FfiProcessor {
    pub(crate) inner: FeedProcessor<UreqTransport>,
}

/// Borrow a C string as `&str`. `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the
/// returned borrow.
pub(crate) unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Hand a Rust string to C. Null if it contains an interior NUL.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}

/// Serialize `value` to a JSON C string.
pub(crate) fn to_c_json<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(s) => into_c_string(s),
        Err(e) => error_json(&format!("serialization failed: {e}")),
    }
}

/// `{"error": message}` as a C string.
pub(crate) fn error_json(message: &str) -> *mut c_char {
    into_c_string(json!({ "error": message }).to_string())
}

pub(crate) fn null_arg(name: &str) -> *mut c_char {
    error_json(&format!("null or non-UTF-8 argument: {name}"))
}
