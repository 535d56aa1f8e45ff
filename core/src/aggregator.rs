use crate::cstring::*;
use crate::record::{Record, Value};

use std::ffi::{c_char, c_double, c_int, c_longlong};

use anyhow::Result;

/// Replica of the Agent check log levels (rtloader numbering)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Critical = 50,
    Error = 40,
    Warning = 30,
    Info = 20,
    Debug = 10,
    Trace = 7,
}

/// Discriminant of a marshalled record value
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    Str = 0,
    Int = 1,
    Float = 2,
}

/// One marshalled record value; only the slot selected by `kind` is set
#[repr(C)]
#[derive(Debug)]
pub struct CValue {
    pub kind: ValueKind,
    pub str_value: *mut c_char,
    pub int_value: c_longlong,
    pub float_value: c_double,
}

impl CValue {
    fn marshal(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Str(s) => Self {
                kind: ValueKind::Str,
                str_value: to_cstring(s)?,
                int_value: 0,
                float_value: 0.0,
            },
            Value::Int(i) => Self {
                kind: ValueKind::Int,
                str_value: std::ptr::null_mut(),
                int_value: *i,
                float_value: 0.0,
            },
            Value::Float(f) => Self {
                kind: ValueKind::Float,
                str_value: std::ptr::null_mut(),
                int_value: 0,
                float_value: *f,
            },
        })
    }

    fn free(self) {
        free_cstring(self.str_value);
    }
}

/// Signature of the submit record function
type SubmitRecord = extern "C" fn(
    *mut c_char,        // check id
    *mut *mut c_char,   // field keys, null-terminated
    *const CValue,      // field values, one per key
    c_int,              // field count
);

/// Signature of the submit log function
type SubmitLog = extern "C" fn(
    *mut c_char,        // check id
    c_int,              // level
    *mut c_char,        // message
);

/// Aggregator stores Go callbacks for submissions
///
/// The check stores a pointer to the Aggregator structure declared in Cgo
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Aggregator {
    cb_submit_record: SubmitRecord,
    cb_submit_log: SubmitLog,
}

impl Aggregator {
    pub fn new(cb_submit_record: SubmitRecord, cb_submit_log: SubmitLog) -> Self {
        Self {
            cb_submit_record,
            cb_submit_log,
        }
    }

    pub fn from_ptr(ptr: *const Aggregator) -> Self {
        // SAFETY: the Agent guarantees the pointer references a valid
        // Aggregator for the duration of the call; the struct is Copy.
        unsafe { *ptr }
    }

    pub fn submit_record(&self, check_id: &str, record: &Record) -> Result<()> {
        // create the C strings
        let cstr_check_id = to_cstring(check_id)?;
        let keys: Vec<String> = record.iter().map(|(k, _)| k.to_string()).collect();
        let cstr_keys = to_cstring_array(&keys)?;

        let mut values = Vec::with_capacity(record.len());
        for (_, value) in record.iter() {
            values.push(CValue::marshal(value)?);
        }
        let count = c_int::try_from(values.len())?;

        // submit the record
        (self.cb_submit_record)(cstr_check_id, cstr_keys, values.as_ptr(), count);

        // free every allocated C string
        free_cstring(cstr_check_id);
        free_cstring_array(cstr_keys);
        for value in values {
            value.free();
        }

        Ok(())
    }

    pub fn submit_log(&self, check_id: &str, level: LogLevel, message: &str) -> Result<()> {
        // create the C strings
        let cstr_check_id = to_cstring(check_id)?;
        let cstr_message = to_cstring(message)?;

        // submit the log line
        (self.cb_submit_log)(cstr_check_id, level as c_int, cstr_message);

        // free every allocated C string
        free_cstring(cstr_check_id);
        free_cstring(cstr_message);

        Ok(())
    }
}
