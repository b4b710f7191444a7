//! C-compatible FFI API for front ends written in other languages.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Buffers returned by `cf_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `cf_free_buffer` / `cf_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error).
//! - Error details can be retrieved via `cf_last_error`.
//! - Per-row failures are not errors: they are listed in the report JSON.
//!
//! ## Thread safety
//! - `cf_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use serde::Serialize;

use crate::batch::BatchResult;
use crate::pipeline::{generate_contracts, PipelineConfig};
use crate::variables::Table;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Report handed back to the caller alongside the archive.
#[derive(Serialize)]
struct Report<'a> {
    archive_name: &'a str,
    #[serde(flatten)]
    result: &'a BatchResult,
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Generate one contract per row and pack them into a zip archive.
///
/// # Parameters
/// - `template_ptr`, `template_len`: the `.docx` template bytes
/// - `rows_ptr`, `rows_len`: UTF-8 JSON array of row objects
/// - `out_buf`, `out_len`: on success, the archive bytes; `*out_buf` is null
///   and `*out_len` is 0 when no row succeeded
/// - `out_report`: receives a null-terminated JSON report (documents, errors,
///   suggested archive name)
///
/// # Returns
/// `0` on success, non-zero on a batch-level error. On error, call
/// `cf_last_error`.
///
/// # Safety
/// - `template_ptr` must point to `template_len` valid bytes, `rows_ptr` to
///   `rows_len` valid bytes.
/// - `out_buf`, `out_len` and `out_report` must be valid pointers.
/// - The caller must free `*out_buf` with `cf_free_buffer` and `*out_report`
///   with `cf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn cf_generate_archive(
    template_ptr: *const u8,
    template_len: u32,
    rows_ptr: *const u8,
    rows_len: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
    out_report: *mut *mut c_char,
) -> c_int {
    if template_ptr.is_null()
        || rows_ptr.is_null()
        || out_buf.is_null()
        || out_len.is_null()
        || out_report.is_null()
    {
        set_last_error("Null pointer argument");
        return 1;
    }

    let template = slice::from_raw_parts(template_ptr, template_len as usize);
    let rows = slice::from_raw_parts(rows_ptr, rows_len as usize);
    let rows = match std::str::from_utf8(rows) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8: {e}"));
            return 2;
        }
    };

    let table = match Table::from_json(rows) {
        Ok(t) => t,
        Err(e) => {
            set_last_error(&e.to_string());
            return 2;
        }
    };

    let generation = match generate_contracts(template, &table, &PipelineConfig::default()) {
        Ok(g) => g,
        Err(e) => {
            set_last_error(&e.to_string());
            return 3;
        }
    };

    let report = Report {
        archive_name: &generation.archive_name,
        result: &generation.result,
    };
    let json = serde_json::to_string(&report).unwrap_or_default();
    let json = match CString::new(json) {
        Ok(cs) => cs,
        Err(_) => {
            set_last_error("Report contained null byte");
            return 4;
        }
    };

    match generation.archive {
        Some(bytes) => {
            let len = bytes.len() as u32;
            let buf = bytes.into_boxed_slice();
            *out_buf = Box::into_raw(buf) as *mut u8;
            *out_len = len;
        }
        None => {
            *out_buf = ptr::null_mut();
            *out_len = 0;
        }
    }
    *out_report = json.into_raw();
    0
}

// ---------------------------------------------------------------------------
// Error & memory management
// ---------------------------------------------------------------------------

/// Retrieve the last error message (null-terminated UTF-8).
///
/// Returns a pointer valid until the next `cf_*` call on this thread.
/// Returns null if no error has been recorded.
#[no_mangle]
pub extern "C" fn cf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cs) => cs.as_ptr(),
        None => ptr::null(),
    })
}

/// Free a buffer previously returned by `cf_generate_archive`.
///
/// # Safety
/// `buf` must have been returned by a `cf_*` function, and `len` must be the
/// length reported alongside it.
#[no_mangle]
pub unsafe extern "C" fn cf_free_buffer(buf: *mut u8, len: u32) {
    if buf.is_null() {
        return;
    }
    let slice = slice::from_raw_parts_mut(buf, len as usize);
    drop(Box::from_raw(slice as *mut [u8]));
}

/// Free a string previously returned by a `cf_*` function.
///
/// # Safety
/// `s` must have been returned by a `cf_*` function.
#[no_mangle]
pub unsafe extern "C" fn cf_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    drop(CString::from_raw(s));
}

/// Library version string (null-terminated, static lifetime).
#[no_mangle]
pub extern "C" fn cf_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}
