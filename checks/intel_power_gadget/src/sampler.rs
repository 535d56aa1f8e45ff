//! The sampler adapter: keeps one sampling window open per package and
//! turns each window over into records on every collection tick.

use std::collections::BTreeMap;

use check_core::Record;

use crate::errors::{Error, PackageError};
use crate::gadget::{Package, PowerGadget, WindowId};
use crate::records;

struct Slot {
    package: Package,
    window: Option<WindowId>,
}

/// Output of one collection cycle: the ordered records plus the per-package
/// failures that did not stop the cycle.
#[derive(Default)]
pub struct Collection {
    pub records: Vec<Record>,
    pub errors: Vec<PackageError>,
}

/// Owns the package table and one sampling window per package. Windows are
/// finished and immediately reopened on every cycle, so consecutive cycles
/// cover contiguous intervals.
pub struct Sampler<G: PowerGadget> {
    gadget: G,
    slots: BTreeMap<i32, Slot>,
    shut_down: bool,
}

impl<G: PowerGadget> Sampler<G> {
    /// Discover the packages and open the initial window on each of them.
    ///
    /// Any failure here is fatal: the check instance fails to load.
    pub fn initialize(gadget: G) -> Result<Self, Error> {
        let packages = gadget.packages()?;
        if packages.is_empty() {
            return Err(Error::NoPackages);
        }
        log::debug!("discovered {} CPU package(s)", packages.len());

        let mut slots = BTreeMap::new();
        for package in packages {
            let window = gadget.start_sampling(&package)?;
            slots.insert(
                package.number,
                Slot {
                    package,
                    window: Some(window),
                },
            );
        }

        Ok(Self {
            gadget,
            slots,
            shut_down: false,
        })
    }

    /// Run one collection cycle over every known package, in ascending
    /// package-number order.
    ///
    /// A failing package lands in `errors` and the remaining packages still
    /// produce their records; a package left without an open window is
    /// reopened here, so it recovers on the next tick.
    pub fn collect(&mut self) -> Collection {
        let mut out = Collection::default();

        for (number, slot) in &mut self.slots {
            let finished = match slot.window.take() {
                Some(window) => self.gadget.finish_sampling(window, &slot.package),
                None => Err(Error::MissingWindow),
            };

            // reopen before shaping so the next window starts immediately
            match self.gadget.start_sampling(&slot.package) {
                Ok(window) => slot.window = Some(window),
                Err(error) => out.errors.push(PackageError {
                    package: *number,
                    source: error,
                }),
            }

            match finished.and_then(|sample| records::shape(&slot.package, &sample)) {
                Ok(records) => out.records.extend(records),
                Err(error) => out.errors.push(PackageError {
                    package: *number,
                    source: error,
                }),
            }
        }

        out
    }

    /// Release the hardware library. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.gadget.shutdown()
    }
}

impl<G: PowerGadget> Drop for Sampler<G> {
    fn drop(&mut self) {
        if self.shutdown().is_err() {
            log::warn!("power gadget shutdown failed during teardown");
        }
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use check_core::Value;

    use super::Sampler;
    use crate::errors::Error;
    use crate::test_utils::{MockGadget, package};

    #[test]
    fn test_one_record_per_package_plus_one_per_core() {
        let gadget = MockGadget::new(vec![package(0, 2), package(1, 4)]);
        let mut sampler = Sampler::initialize(gadget).unwrap();

        let collection = sampler.collect();
        assert!(collection.errors.is_empty());
        // 1 + 2 for package 0, 1 + 4 for package 1
        assert_eq!(collection.records.len(), 8);

        let core_records = collection
            .records
            .iter()
            .filter(|r| r.get("core").is_some())
            .count();
        assert_eq!(core_records, 6);
    }

    #[test]
    fn test_records_are_ordered_by_package_number() {
        // discovery order does not dictate output order
        let gadget = MockGadget::new(vec![package(1, 1), package(0, 1)]);
        let mut sampler = Sampler::initialize(gadget).unwrap();

        let collection = sampler.collect();
        let names: Vec<&Value> = collection
            .records
            .iter()
            .filter(|r| r.get("core").is_none())
            .map(|r| r.get("name").unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                &Value::Str("CPU0".to_string()),
                &Value::Str("CPU1".to_string())
            ]
        );
    }

    #[test]
    fn test_windows_stay_contiguous_across_cycles() {
        let gadget = MockGadget::new(vec![package(0, 2)]);
        let mut sampler = Sampler::initialize(gadget.clone()).unwrap();

        let cycles = 5;
        for _ in 0..cycles {
            let collection = sampler.collect();
            assert!(collection.errors.is_empty());
        }

        // one window opened at initialize, one per cycle; one finished per
        // cycle; exactly one still open, so no gap and no overlap
        assert_eq!(gadget.started(0), cycles + 1);
        assert_eq!(gadget.finished(0).len(), cycles as usize);
        assert_eq!(gadget.open_windows(), 1);

        // each finish consumed the window in the order it was opened
        let finished = gadget.finished(0);
        let mut sorted = finished.clone();
        sorted.sort_unstable();
        assert_eq!(finished, sorted);
    }

    #[test]
    fn test_empty_discovery_is_fatal() {
        let gadget = MockGadget::new(vec![]);
        match Sampler::initialize(gadget) {
            Err(Error::NoPackages) => {}
            _ => panic!("expected initialization to fail with NoPackages"),
        }
    }

    #[test]
    fn test_finish_failure_is_isolated_per_package() {
        let gadget = MockGadget::new(vec![package(0, 2), package(1, 2)]);
        let mut sampler = Sampler::initialize(gadget.clone()).unwrap();

        gadget.fail_next_finish(0);
        let collection = sampler.collect();

        // package 1 still emitted its full record set
        assert_eq!(collection.records.len(), 3);
        assert_eq!(
            collection.records.first().unwrap().get("name"),
            Some(&Value::Str("CPU1".to_string()))
        );
        assert_eq!(collection.errors.len(), 1);
        assert_eq!(collection.errors.first().unwrap().package, 0);

        // package 0 recovered: its window was reopened during the failing cycle
        let collection = sampler.collect();
        assert!(collection.errors.is_empty());
        assert_eq!(collection.records.len(), 6);
    }

    #[test]
    fn test_start_failure_recovers_on_the_next_cycle() {
        let gadget = MockGadget::new(vec![package(0, 1)]);
        let mut sampler = Sampler::initialize(gadget.clone()).unwrap();

        gadget.fail_next_start(0);
        let collection = sampler.collect();
        // the finished window still produced records, the reopen failure is reported
        assert_eq!(collection.records.len(), 2);
        assert_eq!(collection.errors.len(), 1);

        // no window was open, so this cycle reports the gap and reopens
        let collection = sampler.collect();
        assert!(collection.records.is_empty());
        assert_eq!(collection.errors.len(), 1);
        assert!(matches!(
            collection.errors.first().unwrap().source,
            Error::MissingWindow
        ));

        // back to normal
        let collection = sampler.collect();
        assert!(collection.errors.is_empty());
        assert_eq!(collection.records.len(), 2);
    }

    #[test]
    fn test_core_count_mismatch_is_isolated_per_package() {
        let gadget = MockGadget::new(vec![package(0, 2), package(1, 2)]);
        let mut sampler = Sampler::initialize(gadget.clone()).unwrap();

        gadget.truncate_core_vectors(0);
        let collection = sampler.collect();

        assert_eq!(collection.records.len(), 3);
        let error = collection.errors.first().unwrap();
        assert_eq!(error.package, 0);
        assert!(matches!(
            error.source,
            Error::CoreCountMismatch {
                got: 1,
                expected: 2
            }
        ));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let gadget = MockGadget::new(vec![package(0, 1)]);
        let mut sampler = Sampler::initialize(gadget.clone()).unwrap();

        sampler.shutdown().unwrap();
        sampler.shutdown().unwrap();
        drop(sampler);

        // the underlying library was shut down exactly once
        assert_eq!(gadget.shutdowns(), 1);
    }
}
