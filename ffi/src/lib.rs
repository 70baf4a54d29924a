//! C-ABI wrapper around `grautic-core`.
//!
//! # Overview
//! Lets the CMS plugin (PHP, through its FFI extension) run feeds and fill
//! its settings screens without reimplementing the Mautic client. Inputs and
//! outputs are JSON strings.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `grautic_processor_new` performs the one-time credential probe; the
//!   handle is then reused for every submission.
//! - The C caller owns all returned pointers and must release them with the
//!   matching `grautic_*_free` function.

pub mod types;

use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use grautic_core::field_map;
use grautic_core::{Entry, Feed, FeedProcessor, Settings, UreqTransport};
use serde_json::json;

use types::*;

// ---------------------------------------------------------------------------
// Processor lifecycle
// ---------------------------------------------------------------------------

/// Connect a processor from settings JSON
/// (`{"base_url"?, "mautic_username", "mautic_password"}`).
///
/// Returns null if `settings_json` is null, not valid settings, or if an
/// internal panic occurs. Blank or rejected credentials still yield a
/// handle; `grautic_processor_is_ready` reports them.
/// The caller must free the returned pointer with `grautic_processor_free`.
#[unsafe(no_mangle)]
pub extern "C" fn grautic_processor_new(settings_json: *const c_char) -> *mut FfiProcessor {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(raw) = (unsafe { read_str(settings_json) }) else {
            return std::ptr::null_mut();
        };
        let settings: Settings = match serde_json::from_str(raw) {
            Ok(s) => s,
            Err(_) => return std::ptr::null_mut(),
        };
        let inner = FeedProcessor::connect(&settings, UreqTransport::new());
        Box::into_raw(Box::new(FfiProcessor { inner }))
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Free a processor created by `grautic_processor_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn grautic_processor_free(processor: *mut FfiProcessor) {
    if !processor.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(processor) });
        }));
    }
}

/// Whether the credentials were present and accepted by Mautic.
#[unsafe(no_mangle)]
pub extern "C" fn grautic_processor_is_ready(processor: *const FfiProcessor) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if processor.is_null() {
            return false;
        }
        let processor = unsafe { &*processor };
        processor.inner.can_create_feed()
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Feed processing
// ---------------------------------------------------------------------------

/// Send one entry to the feed's segment.
///
/// Returns the feed report as JSON, or `{"error": ...}` when an argument is
/// null or does not parse. Never returns null unless allocation of the
/// message itself fails.
#[unsafe(no_mangle)]
pub extern "C" fn grautic_process_feed(
    processor: *const FfiProcessor,
    feed_json: *const c_char,
    entry_json: *const c_char,
) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if processor.is_null() {
            return null_arg("processor");
        }
        let Some(feed_raw) = (unsafe { read_str(feed_json) }) else {
            return null_arg("feed");
        };
        let Some(entry_raw) = (unsafe { read_str(entry_json) }) else {
            return null_arg("entry");
        };
        let feed: Feed = match serde_json::from_str(feed_raw) {
            Ok(f) => f,
            Err(e) => return error_json(&format!("invalid feed: {e}")),
        };
        let entry: Entry = match serde_json::from_str(entry_raw) {
            Ok(e) => e,
            Err(e) => return error_json(&format!("invalid entry: {e}")),
        };
        let processor = unsafe { &*processor };
        to_c_json(&processor.inner.process_feed(&feed, &entry))
    }))
    .unwrap_or_else(|_| error_json("panic in grautic_process_feed"))
}

// ---------------------------------------------------------------------------
// Settings screens
// ---------------------------------------------------------------------------

/// Segment picker options as `{"choices": [{label, value}, ...]}`, or
/// `{"error": ...}` when the lists cannot be loaded.
#[unsafe(no_mangle)]
pub extern "C" fn grautic_segment_choices(processor: *const FfiProcessor) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if processor.is_null() {
            return null_arg("processor");
        }
        let processor = unsafe { &*processor };
        match processor.inner.segment_choices() {
            Ok(choices) => to_c_json(&json!({ "choices": choices })),
            Err(e) => error_json(&e.to_string()),
        }
    }))
    .unwrap_or_else(|_| error_json("panic in grautic_segment_choices"))
}

/// Custom-field rows as a JSON array (empty when unavailable).
#[unsafe(no_mangle)]
pub extern "C" fn grautic_custom_field_map(processor: *const FfiProcessor) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if processor.is_null() {
            return null_arg("processor");
        }
        let processor = unsafe { &*processor };
        to_c_json(&processor.inner.custom_field_map())
    }))
    .unwrap_or_else(|_| error_json("panic in grautic_custom_field_map"))
}

/// Standard-field rows as a JSON array.
#[unsafe(no_mangle)]
pub extern "C" fn grautic_standard_field_map() -> *mut c_char {
    catch_unwind(|| to_c_json(&field_map::standard_field_map()))
        .unwrap_or_else(|_| error_json("panic in grautic_standard_field_map"))
}

/// Segment name for the feed list, as a plain C string. Falls back to the
/// configured segment ID. Returns null if an argument is null or the feed
/// does not parse.
#[unsafe(no_mangle)]
pub extern "C" fn grautic_segment_column_value(
    processor: *const FfiProcessor,
    feed_json: *const c_char,
) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if processor.is_null() {
            return std::ptr::null_mut();
        }
        let Some(raw) = (unsafe { read_str(feed_json) }) else {
            return std::ptr::null_mut();
        };
        let Ok(feed) = serde_json::from_str::<Feed>(raw) else {
            return std::ptr::null_mut();
        };
        let processor = unsafe { &*processor };
        into_c_string(processor.inner.segment_column_value(&feed))
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a string returned by any `grautic_*` function. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn grautic_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { std::ffi::CString::from_raw(s) });
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};
    use std::net::SocketAddr;

    /// Take ownership of a returned string and parse it as JSON.
    fn take_json(ptr: *mut c_char) -> serde_json::Value {
        assert!(!ptr.is_null());
        let value = serde_json::from_str(unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()).unwrap();
        grautic_string_free(ptr);
        value
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn start_server() -> SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });
        addr
    }

    const FEED: &str = r#"{"id":"1","name":"Newsletter","segment_id":"42","mapped_fields":{"email":"1"}}"#;

    #[test]
    fn processor_new_null_returns_null() {
        assert!(grautic_processor_new(std::ptr::null()).is_null());
    }

    #[test]
    fn processor_new_invalid_json_returns_null() {
        let bad = c("not json");
        assert!(grautic_processor_new(bad.as_ptr()).is_null());
    }

    #[test]
    fn processor_free_null_is_safe() {
        grautic_processor_free(std::ptr::null_mut());
    }

    #[test]
    fn string_free_null_is_safe() {
        grautic_string_free(std::ptr::null_mut());
    }

    #[test]
    fn blank_credentials_yield_unready_processor() {
        let settings = c(r#"{"mautic_username":"","mautic_password":""}"#);
        let processor = grautic_processor_new(settings.as_ptr());
        assert!(!processor.is_null());
        assert!(!grautic_processor_is_ready(processor));

        let feed = c(FEED);
        let entry = c(r#"{"id":"5","values":{"1":"a@b.com"}}"#);
        let report = take_json(grautic_process_feed(processor, feed.as_ptr(), entry.as_ptr()));
        assert_eq!(report["stage"], "failed");
        assert_eq!(report["notes"][0]["level"], "error");
        assert!(report["notes"][0]["message"]
            .as_str()
            .unwrap()
            .contains("API could not be initialized"));

        let column = grautic_segment_column_value(processor, feed.as_ptr());
        assert_eq!(unsafe { CStr::from_ptr(column) }.to_str().unwrap(), "42");
        grautic_string_free(column);

        grautic_processor_free(processor);
    }

    #[test]
    fn process_feed_null_args_return_error_envelope() {
        let report = take_json(grautic_process_feed(
            std::ptr::null(),
            std::ptr::null(),
            std::ptr::null(),
        ));
        assert!(report["error"].as_str().unwrap().contains("processor"));
    }

    #[test]
    fn process_feed_invalid_feed_is_reported() {
        let settings = c(r#"{"mautic_username":"","mautic_password":""}"#);
        let processor = grautic_processor_new(settings.as_ptr());
        let feed = c(r#"{"name":"no segment"}"#);
        let entry = c("{}");
        let report = take_json(grautic_process_feed(processor, feed.as_ptr(), entry.as_ptr()));
        assert!(report["error"].as_str().unwrap().starts_with("invalid feed"));
        grautic_processor_free(processor);
    }

    #[test]
    fn standard_field_map_lists_email_first() {
        let rows = take_json(grautic_standard_field_map());
        assert_eq!(rows[0]["name"], "email");
        assert_eq!(rows[1]["name"], "firstname");
    }

    #[test]
    fn full_round_trip_against_mock_server() {
        let addr = start_server();
        let settings = c(&format!(
            r#"{{"base_url":"http://{addr}/api","mautic_username":"admin","mautic_password":"secret"}}"#
        ));
        let processor = grautic_processor_new(settings.as_ptr());
        assert!(grautic_processor_is_ready(processor));

        let choices = take_json(grautic_segment_choices(processor));
        assert_eq!(choices["choices"][2]["value"], "42");

        let fields = take_json(grautic_custom_field_map(processor));
        assert_eq!(fields[0]["label"], "Company Size");

        let feed = c(FEED);
        let entry = c(r#"{"id":"5","values":{"1":"a@b.com"}}"#);
        let report = take_json(grautic_process_feed(processor, feed.as_ptr(), entry.as_ptr()));
        assert_eq!(report["stage"], "done");
        assert_eq!(report["contact_id"], "1");
        assert_eq!(report["notes"][0]["level"], "success");

        grautic_processor_free(processor);
    }
}
