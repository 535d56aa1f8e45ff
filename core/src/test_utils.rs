//! Capturing mock aggregator for check tests.
//!
//! Submissions are captured into static buffers keyed by check id, so tests
//! running in parallel do not step on each other as long as they use
//! distinct check ids.
#![allow(clippy::unwrap_used)]

use crate::aggregator::{Aggregator, CValue, ValueKind};
use crate::record::{Record, Value};

use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_int};
use std::sync::{Mutex, OnceLock};

static RECORDS: OnceLock<Mutex<HashMap<String, Vec<Record>>>> = OnceLock::new();
static LOGS: OnceLock<Mutex<HashMap<String, Vec<(i32, String)>>>> = OnceLock::new();

fn records() -> &'static Mutex<HashMap<String, Vec<Record>>> {
    RECORDS.get_or_init(Default::default)
}

fn logs() -> &'static Mutex<HashMap<String, Vec<(i32, String)>>> {
    LOGS.get_or_init(Default::default)
}

/// Helper function to safely convert C string to Rust string
fn c_str_to_string(ptr: *mut c_char) -> String {
    if ptr.is_null() {
        "NULL".to_string()
    } else {
        // SAFETY: the pointer is non-null and the submitter keeps the string
        // alive for the duration of the callback.
        unsafe { CStr::from_ptr(ptr) }
            .to_str()
            .unwrap_or("<invalid_utf8>")
            .to_string()
    }
}

/// Mock implementation of SubmitRecord: rebuilds the Record and captures it
extern "C" fn mock_submit_record(
    check_id: *mut c_char,
    keys: *mut *mut c_char,
    values: *const CValue,
    count: c_int,
) {
    let id = c_str_to_string(check_id);
    let count = usize::try_from(count).unwrap_or(0);

    // SAFETY: the submitter passes `count` valid entries in the value array
    // and at least as many in the null-terminated key array.
    let values = unsafe { std::slice::from_raw_parts(values, count) };

    let mut record = Record::new();
    let mut key_ptr = keys;
    for value in values {
        // SAFETY: one key per value, see above.
        let key = c_str_to_string(unsafe { *key_ptr });
        let converted = match value.kind {
            ValueKind::Str => Value::Str(c_str_to_string(value.str_value)),
            ValueKind::Int => Value::Int(value.int_value),
            ValueKind::Float => Value::Float(value.float_value),
        };
        record.push(&key, converted);

        // SAFETY: stays within the key array bounds.
        key_ptr = unsafe { key_ptr.add(1) };
    }

    records().lock().unwrap().entry(id).or_default().push(record);
}

/// Mock implementation of SubmitLog
extern "C" fn mock_submit_log(check_id: *mut c_char, level: c_int, message: *mut c_char) {
    let id = c_str_to_string(check_id);
    logs()
        .lock()
        .unwrap()
        .entry(id)
        .or_default()
        .push((level, c_str_to_string(message)));
}

pub fn mock_aggregator() -> Aggregator {
    Aggregator::new(mock_submit_record, mock_submit_log)
}

/// Drain the records captured for one check id
pub fn take_records(check_id: &str) -> Vec<Record> {
    records()
        .lock()
        .unwrap()
        .remove(check_id)
        .unwrap_or_default()
}

/// Drain the log lines captured for one check id
pub fn take_logs(check_id: &str) -> Vec<(i32, String)> {
    logs().lock().unwrap().remove(check_id).unwrap_or_default()
}
