//! Shapes one package's sample into the flat records the Agent consumes:
//! one package-level record plus one record per core.

use check_core::Record;

use crate::errors::Error;
use crate::gadget::{KHZ_PER_MHZ, Package, Sample};

pub(crate) fn shape(package: &Package, sample: &Sample) -> Result<Vec<Record>, Error> {
    let expected = usize::try_from(package.cores).unwrap_or_default();
    for got in [
        sample.ia_core_frequency.len(),
        sample.ia_core_frequency_request.len(),
        sample.ia_core_temperature.len(),
        sample.ia_core_utilization.len(),
    ] {
        if got != expected {
            return Err(Error::CoreCountMismatch { got, expected });
        }
    }

    let mut records = Vec::with_capacity(1 + expected);
    records.push(package_record(package, sample));

    let cores = sample
        .ia_core_frequency
        .iter()
        .zip(&sample.ia_core_frequency_request)
        .zip(&sample.ia_core_temperature)
        .zip(&sample.ia_core_utilization);
    for (idx, (((frequency, request), temperature), utilization)) in (0i64..).zip(cores) {
        records.push(
            Record::new()
                .str("name", format!("CPU{}", package.number))
                .int("package_no", i64::from(package.number))
                .int("core", idx)
                .str("core_name", format!("CPU{} Core {}", package.number, idx))
                .float("ia_core_frequency", frequency.mean / KHZ_PER_MHZ)
                .float("ia_core_frequency_request", request.mean / KHZ_PER_MHZ)
                .float("ia_core_temperature", temperature.mean)
                .float("ia_core_utilization", *utilization),
        );
    }

    Ok(records)
}

fn package_record(package: &Package, sample: &Sample) -> Record {
    Record::new()
        .str("name", format!("CPU{}", package.number))
        .int("package_no", i64::from(package.number))
        .int("package_cores", i64::from(package.cores))
        .float("ia_base_frequency", package.ia_base_frequency / KHZ_PER_MHZ)
        .float("ia_max_frequency", package.ia_max_frequency / KHZ_PER_MHZ)
        .float("gt_max_frequency", package.gt_max_frequency / KHZ_PER_MHZ)
        .float("package_tdp", package.tdp)
        .float("max_temperature", package.max_temperature)
        .float("ia_frequency", sample.ia_frequency.mean / KHZ_PER_MHZ)
        .float(
            "ia_frequency_request",
            sample.ia_frequency_request.mean / KHZ_PER_MHZ,
        )
        .float("ia_power", sample.ia_power.watts)
        .float("ia_temperature", sample.ia_temperature.mean)
        .float("ia_utilization", sample.ia_utilization)
        .float("gt_frequency", sample.gt_frequency / KHZ_PER_MHZ)
        .float(
            "gt_frequency_request",
            sample.gt_frequency_request / KHZ_PER_MHZ,
        )
        .float("gt_utilization", sample.gt_utilization)
        .float("package_power", sample.package_power.watts)
        .float("platform_power", sample.platform_power.watts)
        .float("dram_power", sample.dram_power.watts)
        .float("package_temperature", sample.package_temperature)
        .float("tdp", sample.tdp)
}
