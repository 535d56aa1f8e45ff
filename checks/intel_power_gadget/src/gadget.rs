//! Data model of the hardware-access boundary.

use crate::errors::Error;

/// Library frequencies are carried in kilohertz; records display megahertz.
pub(crate) const KHZ_PER_MHZ: f64 = 1000.0;

/// A physical CPU package and its static attributes, fixed at discovery
/// time for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub number: i32,
    pub cores: i32,
    /// IA base frequency in kilohertz.
    pub ia_base_frequency: f64,
    /// IA maximum (turbo) frequency in kilohertz.
    pub ia_max_frequency: f64,
    /// GT maximum frequency in kilohertz.
    pub gt_max_frequency: f64,
    /// Thermal design power in watts.
    pub tdp: f64,
    /// Maximum junction temperature in degrees Celsius.
    pub max_temperature: f64,
}

/// Mean, minimum and maximum of a quantity over one sampling window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measure {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Energy drawn over one sampling window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Power {
    pub watts: f64,
    pub joules: f64,
}

/// Handle of one open sampling window, bound to one package. Opened by
/// `start_sampling`, consumed by `finish_sampling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// Measurements accumulated over one sampling window.
///
/// The per-core vectors hold one entry per package core; a length that does
/// not match the package's core count is reported as a per-package error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub ia_frequency: Measure,
    pub ia_frequency_request: Measure,
    pub ia_temperature: Measure,
    pub ia_power: Power,
    pub ia_utilization: f64,
    pub gt_frequency: f64,
    pub gt_frequency_request: f64,
    pub gt_utilization: f64,
    pub package_power: Power,
    pub platform_power: Power,
    pub dram_power: Power,
    pub package_temperature: f64,
    pub tdp: f64,
    pub ia_core_frequency: Vec<Measure>,
    pub ia_core_frequency_request: Vec<Measure>,
    pub ia_core_temperature: Vec<Measure>,
    pub ia_core_utilization: Vec<f64>,
}

/// The hardware-access boundary. The production implementation wraps the
/// Intel Power Gadget shared library; tests substitute a mock.
pub trait PowerGadget {
    /// Discover the available CPU packages.
    fn packages(&self) -> Result<Vec<Package>, Error>;

    /// Open a sampling window on a package.
    fn start_sampling(&self, package: &Package) -> Result<WindowId, Error>;

    /// Close a window and read the sample it accumulated.
    fn finish_sampling(&self, window: WindowId, package: &Package) -> Result<Sample, Error>;

    /// Release the library's process-wide resources. Must be idempotent.
    fn shutdown(&mut self) -> Result<(), Error>;
}
