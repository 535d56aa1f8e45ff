// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

// modules used by checks
mod check;
pub use check::{AgentCheck, Check};

mod aggregator;
pub use aggregator::{Aggregator, CValue, LogLevel, ValueKind};

mod config;
pub use config::Config;

mod record;
pub use record::{Record, Value};

// FFI using the C-ABI
mod ffi;

mod cstring;
pub use cstring::free_cstring;
pub use cstring::to_cstring;
pub use cstring::to_rust_string;

// helpers for unit tests
#[cfg(feature = "test-utils")]
pub mod test_utils;
