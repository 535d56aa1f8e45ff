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

mod check;
mod errors;
mod gadget;
mod native;
mod records;
mod sampler;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export the public API
pub use check::PowerGadgetCheck;
pub use errors::{Error, PackageError};
pub use gadget::{Measure, Package, Power, PowerGadget, Sample, WindowId};
pub use native::NativeGadget;
pub use sampler::{Collection, Sampler};

check_core::generate_check_ffi!(
    PowerGadgetCheck<NativeGadget>,
    c"intel_power_gadget",
    c"0.1.0"
);
