//! Runtime binding of the Intel Power Gadget shared library.
//!
//! Loading the library performs `PG_Initialize`; `shutdown` (or drop)
//! performs `PG_Shutdown`, making the library's process-wide lifecycle an
//! explicit object rather than ambient global state.

use std::ffi::{c_double, c_int};

use libloading::Library;

use crate::errors::Error;
use crate::gadget::{KHZ_PER_MHZ, Measure, Package, Power, PowerGadget, Sample, WindowId};

/// Sample handle type of the library (PGSampleID).
type PgSampleId = u64;

type InitFn = unsafe extern "C" fn() -> bool;
type ShutdownFn = unsafe extern "C" fn() -> bool;
type NumFn = unsafe extern "C" fn(*mut c_int) -> bool;
type PackageNumFn = unsafe extern "C" fn(c_int, *mut c_int) -> bool;
type PackageValueFn = unsafe extern "C" fn(c_int, *mut c_double) -> bool;
type ReadSampleFn = unsafe extern "C" fn(c_int, *mut PgSampleId) -> bool;
type ReleaseSampleFn = unsafe extern "C" fn(PgSampleId) -> bool;
type MeasureFn = unsafe extern "C" fn(
    PgSampleId,
    PgSampleId,
    *mut c_double,
    *mut c_double,
    *mut c_double,
) -> bool;
type CoreMeasureFn = unsafe extern "C" fn(
    PgSampleId,
    PgSampleId,
    c_int,
    *mut c_double,
    *mut c_double,
    *mut c_double,
) -> bool;
type PowerFn =
    unsafe extern "C" fn(PgSampleId, PgSampleId, *mut c_double, *mut c_double) -> bool;
type ValueFn = unsafe extern "C" fn(PgSampleId, PgSampleId, *mut c_double) -> bool;
type CoreValueFn = unsafe extern "C" fn(PgSampleId, PgSampleId, c_int, *mut c_double) -> bool;

/// Function pointers resolved once at load, so per-tick calls stay cheap.
struct Api {
    initialize: InitFn,
    shutdown: ShutdownFn,
    get_num_packages: NumFn,
    get_num_cores: PackageNumFn,
    get_ia_base_frequency: PackageValueFn,
    get_ia_max_frequency: PackageValueFn,
    get_gt_max_frequency: PackageValueFn,
    get_tdp: PackageValueFn,
    get_max_temperature: PackageValueFn,
    read_sample: ReadSampleFn,
    release_sample: ReleaseSampleFn,
    ia_frequency: MeasureFn,
    ia_frequency_request: MeasureFn,
    ia_temperature: MeasureFn,
    ia_power: PowerFn,
    ia_utilization: ValueFn,
    gt_frequency: ValueFn,
    gt_frequency_request: ValueFn,
    gt_utilization: ValueFn,
    package_power: PowerFn,
    platform_power: PowerFn,
    dram_power: PowerFn,
    package_temperature: ValueFn,
    tdp: ValueFn,
    ia_core_frequency: CoreMeasureFn,
    ia_core_frequency_request: CoreMeasureFn,
    ia_core_temperature: CoreMeasureFn,
    ia_core_utilization: CoreValueFn,
}

fn sym<T: Copy>(lib: &Library, name: &'static str) -> Result<T, Error> {
    // SAFETY: every type this binding resolves is declared to match the
    // library's C prototypes; the pointers stay valid while the Library is.
    let symbol = unsafe { lib.get::<T>(name.as_bytes()) }
        .map_err(|source| Error::Symbol { symbol: name, source })?;
    Ok(*symbol)
}

impl Api {
    fn resolve(lib: &Library) -> Result<Self, Error> {
        Ok(Self {
            initialize: sym(lib, "PG_Initialize")?,
            shutdown: sym(lib, "PG_Shutdown")?,
            get_num_packages: sym(lib, "PG_GetNumPackages")?,
            get_num_cores: sym(lib, "PG_GetNumCores")?,
            get_ia_base_frequency: sym(lib, "PG_GetIABaseFrequency")?,
            get_ia_max_frequency: sym(lib, "PG_GetIAMaxFrequency")?,
            get_gt_max_frequency: sym(lib, "PG_GetGTMaxFrequency")?,
            get_tdp: sym(lib, "PG_GetTDP")?,
            get_max_temperature: sym(lib, "PG_GetMaxTemperature")?,
            read_sample: sym(lib, "PG_ReadSample")?,
            release_sample: sym(lib, "PGSample_Release")?,
            ia_frequency: sym(lib, "PGSample_GetIAFrequency")?,
            ia_frequency_request: sym(lib, "PGSample_GetIAFrequencyRequest")?,
            ia_temperature: sym(lib, "PGSample_GetIATemperature")?,
            ia_power: sym(lib, "PGSample_GetIAPower")?,
            ia_utilization: sym(lib, "PGSample_GetIAUtilization")?,
            gt_frequency: sym(lib, "PGSample_GetGTFrequency")?,
            gt_frequency_request: sym(lib, "PGSample_GetGTFrequencyRequest")?,
            gt_utilization: sym(lib, "PGSample_GetGTUtilization")?,
            package_power: sym(lib, "PGSample_GetPackagePower")?,
            platform_power: sym(lib, "PGSample_GetPlatformPower")?,
            dram_power: sym(lib, "PGSample_GetDRAMPower")?,
            package_temperature: sym(lib, "PGSample_GetPackageTemperature")?,
            tdp: sym(lib, "PGSample_GetTDP")?,
            ia_core_frequency: sym(lib, "PGSample_GetIACoreFrequency")?,
            ia_core_frequency_request: sym(lib, "PGSample_GetIACoreFrequencyRequest")?,
            ia_core_temperature: sym(lib, "PGSample_GetIACoreTemperature")?,
            ia_core_utilization: sym(lib, "PGSample_GetIACoreUtilization")?,
        })
    }
}

fn default_library_path() -> Result<&'static str, Error> {
    if cfg!(target_os = "macos") {
        Ok("/Library/Frameworks/IntelPowerGadget.framework/IntelPowerGadget")
    } else if cfg!(target_os = "windows") {
        Ok("EnergyLib64.dll")
    } else {
        Err(Error::NoDefaultLibrary)
    }
}

fn check(ok: bool, symbol: &'static str) -> Result<(), Error> {
    if ok { Ok(()) } else { Err(Error::Call { symbol }) }
}

/// Scale a frequency measure from the library's megahertz to kilohertz.
fn khz(measure: Measure) -> Measure {
    Measure {
        mean: measure.mean * KHZ_PER_MHZ,
        min: measure.min * KHZ_PER_MHZ,
        max: measure.max * KHZ_PER_MHZ,
    }
}

/// Production [`PowerGadget`] backed by the Intel Power Gadget shared
/// library, loaded at runtime from the platform default location or from
/// the instance's `library_path`.
pub struct NativeGadget {
    api: Api,
    shut_down: bool,
    // keeps the resolved function pointers valid
    _lib: Library,
}

impl NativeGadget {
    /// Load the library, resolve its symbols and run `PG_Initialize`.
    pub fn open(library_path: Option<&str>) -> Result<Self, Error> {
        let path = match library_path {
            Some(path) => path,
            None => default_library_path()?,
        };

        // SAFETY: loading runs the library's initialization routines, which
        // the Intel Power Gadget library keeps free of side effects until
        // PG_Initialize is called.
        let lib = unsafe { Library::new(path) }.map_err(|source| Error::Load {
            path: path.to_string(),
            source,
        })?;
        let api = Api::resolve(&lib)?;

        // SAFETY: PG_Initialize takes no arguments.
        check(unsafe { (api.initialize)() }, "PG_Initialize")?;
        log::debug!("loaded Intel Power Gadget library from {path}");

        Ok(Self {
            api,
            shut_down: false,
            _lib: lib,
        })
    }

    fn package_value(
        &self,
        f: PackageValueFn,
        package: c_int,
        symbol: &'static str,
    ) -> Result<f64, Error> {
        let mut value = 0f64;
        // SAFETY: the out-pointer is valid for the duration of the call.
        check(unsafe { f(package, &mut value) }, symbol)?;
        Ok(value)
    }

    fn measure(
        &self,
        f: MeasureFn,
        first: PgSampleId,
        second: PgSampleId,
        symbol: &'static str,
    ) -> Result<Measure, Error> {
        let (mut mean, mut min, mut max) = (0f64, 0f64, 0f64);
        // SAFETY: the out-pointers are valid for the duration of the call.
        check(
            unsafe { f(first, second, &mut mean, &mut min, &mut max) },
            symbol,
        )?;
        Ok(Measure { mean, min, max })
    }

    fn core_measure(
        &self,
        f: CoreMeasureFn,
        first: PgSampleId,
        second: PgSampleId,
        core: c_int,
        symbol: &'static str,
    ) -> Result<Measure, Error> {
        let (mut mean, mut min, mut max) = (0f64, 0f64, 0f64);
        // SAFETY: the out-pointers are valid for the duration of the call.
        check(
            unsafe { f(first, second, core, &mut mean, &mut min, &mut max) },
            symbol,
        )?;
        Ok(Measure { mean, min, max })
    }

    fn power(
        &self,
        f: PowerFn,
        first: PgSampleId,
        second: PgSampleId,
        symbol: &'static str,
    ) -> Result<Power, Error> {
        let (mut watts, mut joules) = (0f64, 0f64);
        // SAFETY: the out-pointers are valid for the duration of the call.
        check(unsafe { f(first, second, &mut watts, &mut joules) }, symbol)?;
        Ok(Power { watts, joules })
    }

    fn value(
        &self,
        f: ValueFn,
        first: PgSampleId,
        second: PgSampleId,
        symbol: &'static str,
    ) -> Result<f64, Error> {
        let mut value = 0f64;
        // SAFETY: the out-pointer is valid for the duration of the call.
        check(unsafe { f(first, second, &mut value) }, symbol)?;
        Ok(value)
    }

    fn core_value(
        &self,
        f: CoreValueFn,
        first: PgSampleId,
        second: PgSampleId,
        core: c_int,
        symbol: &'static str,
    ) -> Result<f64, Error> {
        let mut value = 0f64;
        // SAFETY: the out-pointer is valid for the duration of the call.
        check(unsafe { f(first, second, core, &mut value) }, symbol)?;
        Ok(value)
    }

    fn read_window(
        &self,
        first: PgSampleId,
        second: PgSampleId,
        package: &Package,
    ) -> Result<Sample, Error> {
        let api = &self.api;
        let mut sample = Sample {
            ia_frequency: khz(self.measure(
                api.ia_frequency,
                first,
                second,
                "PGSample_GetIAFrequency",
            )?),
            ia_frequency_request: khz(self.measure(
                api.ia_frequency_request,
                first,
                second,
                "PGSample_GetIAFrequencyRequest",
            )?),
            ia_temperature: self.measure(
                api.ia_temperature,
                first,
                second,
                "PGSample_GetIATemperature",
            )?,
            ia_power: self.power(api.ia_power, first, second, "PGSample_GetIAPower")?,
            ia_utilization: self.value(
                api.ia_utilization,
                first,
                second,
                "PGSample_GetIAUtilization",
            )?,
            gt_frequency: self.value(api.gt_frequency, first, second, "PGSample_GetGTFrequency")?
                * KHZ_PER_MHZ,
            gt_frequency_request: self.value(
                api.gt_frequency_request,
                first,
                second,
                "PGSample_GetGTFrequencyRequest",
            )? * KHZ_PER_MHZ,
            gt_utilization: self.value(
                api.gt_utilization,
                first,
                second,
                "PGSample_GetGTUtilization",
            )?,
            package_power: self.power(
                api.package_power,
                first,
                second,
                "PGSample_GetPackagePower",
            )?,
            platform_power: self.power(
                api.platform_power,
                first,
                second,
                "PGSample_GetPlatformPower",
            )?,
            dram_power: self.power(api.dram_power, first, second, "PGSample_GetDRAMPower")?,
            package_temperature: self.value(
                api.package_temperature,
                first,
                second,
                "PGSample_GetPackageTemperature",
            )?,
            tdp: self.value(api.tdp, first, second, "PGSample_GetTDP")?,
            ..Sample::default()
        };

        for core in 0..package.cores {
            sample.ia_core_frequency.push(khz(self.core_measure(
                api.ia_core_frequency,
                first,
                second,
                core,
                "PGSample_GetIACoreFrequency",
            )?));
            sample.ia_core_frequency_request.push(khz(self.core_measure(
                api.ia_core_frequency_request,
                first,
                second,
                core,
                "PGSample_GetIACoreFrequencyRequest",
            )?));
            sample.ia_core_temperature.push(self.core_measure(
                api.ia_core_temperature,
                first,
                second,
                core,
                "PGSample_GetIACoreTemperature",
            )?);
            sample.ia_core_utilization.push(self.core_value(
                api.ia_core_utilization,
                first,
                second,
                core,
                "PGSample_GetIACoreUtilization",
            )?);
        }

        Ok(sample)
    }
}

impl PowerGadget for NativeGadget {
    fn packages(&self) -> Result<Vec<Package>, Error> {
        let mut count: c_int = 0;
        // SAFETY: the out-pointer is valid for the duration of the call.
        check(
            unsafe { (self.api.get_num_packages)(&mut count) },
            "PG_GetNumPackages",
        )?;

        let mut packages = Vec::new();
        for number in 0..count {
            let mut cores: c_int = 0;
            // SAFETY: the out-pointer is valid for the duration of the call.
            check(
                unsafe { (self.api.get_num_cores)(number, &mut cores) },
                "PG_GetNumCores",
            )?;

            packages.push(Package {
                number,
                cores,
                ia_base_frequency: self.package_value(
                    self.api.get_ia_base_frequency,
                    number,
                    "PG_GetIABaseFrequency",
                )? * KHZ_PER_MHZ,
                ia_max_frequency: self.package_value(
                    self.api.get_ia_max_frequency,
                    number,
                    "PG_GetIAMaxFrequency",
                )? * KHZ_PER_MHZ,
                gt_max_frequency: self.package_value(
                    self.api.get_gt_max_frequency,
                    number,
                    "PG_GetGTMaxFrequency",
                )? * KHZ_PER_MHZ,
                tdp: self.package_value(self.api.get_tdp, number, "PG_GetTDP")?,
                max_temperature: self.package_value(
                    self.api.get_max_temperature,
                    number,
                    "PG_GetMaxTemperature",
                )?,
            });
        }

        Ok(packages)
    }

    fn start_sampling(&self, package: &Package) -> Result<WindowId, Error> {
        let mut id: PgSampleId = 0;
        // SAFETY: the out-pointer is valid for the duration of the call.
        check(
            unsafe { (self.api.read_sample)(package.number, &mut id) },
            "PG_ReadSample",
        )?;
        Ok(WindowId(id))
    }

    fn finish_sampling(&self, window: WindowId, package: &Package) -> Result<Sample, Error> {
        let first = window.0;
        let mut second: PgSampleId = 0;
        // SAFETY: the out-pointer is valid for the duration of the call.
        check(
            unsafe { (self.api.read_sample)(package.number, &mut second) },
            "PG_ReadSample",
        )?;

        let result = self.read_window(first, second, package);

        // release both ends of the window even when reading failed
        // SAFETY: both sample ids were handed out by PG_ReadSample.
        let _ = unsafe { (self.api.release_sample)(first) };
        // SAFETY: see above.
        let _ = unsafe { (self.api.release_sample)(second) };

        result
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        // SAFETY: PG_Shutdown takes no arguments.
        check(unsafe { (self.api.shutdown)() }, "PG_Shutdown")
    }
}

impl Drop for NativeGadget {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shut_down = true;
            // SAFETY: PG_Shutdown takes no arguments.
            if !unsafe { (self.api.shutdown)() } {
                log::warn!("PG_Shutdown failed during teardown");
            }
        }
    }
}
