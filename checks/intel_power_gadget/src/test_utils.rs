//! Mock hardware layer with call counters and failure injection.
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::errors::Error;
use crate::gadget::{Measure, Package, Power, PowerGadget, Sample, WindowId};

#[derive(Default)]
struct State {
    next_window: u64,
    open: Vec<(u64, i32)>, // (window id, package number) in open order
    started: HashMap<i32, u32>,
    finished: HashMap<i32, Vec<u64>>,
    shutdowns: u32,
    fail_finish: HashSet<i32>,
    fail_start: HashSet<i32>,
    short_core_vectors: HashSet<i32>,
}

/// Mock [`PowerGadget`]. Clones share the same state so tests can keep a
/// handle for assertions after handing the gadget to a sampler.
#[derive(Clone)]
pub(crate) struct MockGadget {
    packages: Vec<Package>,
    state: Rc<RefCell<State>>,
}

impl MockGadget {
    pub fn new(packages: Vec<Package>) -> Self {
        Self {
            packages,
            state: Rc::default(),
        }
    }

    /// Make the next finish_sampling call on this package fail.
    pub fn fail_next_finish(&self, package: i32) {
        self.state.borrow_mut().fail_finish.insert(package);
    }

    /// Make the next start_sampling call on this package fail.
    pub fn fail_next_start(&self, package: i32) {
        self.state.borrow_mut().fail_start.insert(package);
    }

    /// Make this package's samples carry one core entry too few.
    pub fn truncate_core_vectors(&self, package: i32) {
        self.state.borrow_mut().short_core_vectors.insert(package);
    }

    pub fn started(&self, package: i32) -> u32 {
        self.state
            .borrow()
            .started
            .get(&package)
            .copied()
            .unwrap_or(0)
    }

    pub fn finished(&self, package: i32) -> Vec<u64> {
        self.state
            .borrow()
            .finished
            .get(&package)
            .cloned()
            .unwrap_or_default()
    }

    pub fn open_windows(&self) -> usize {
        self.state.borrow().open.len()
    }

    pub fn shutdowns(&self) -> u32 {
        self.state.borrow().shutdowns
    }
}

impl PowerGadget for MockGadget {
    fn packages(&self) -> Result<Vec<Package>, Error> {
        Ok(self.packages.clone())
    }

    fn start_sampling(&self, package: &Package) -> Result<WindowId, Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_start.remove(&package.number) {
            return Err(Error::Call {
                symbol: "PG_ReadSample",
            });
        }

        state.next_window += 1;
        let id = state.next_window;
        state.open.push((id, package.number));
        *state.started.entry(package.number).or_default() += 1;
        Ok(WindowId(id))
    }

    fn finish_sampling(&self, window: WindowId, package: &Package) -> Result<Sample, Error> {
        let mut state = self.state.borrow_mut();

        let position = state.open.iter().position(|(id, _)| *id == window.0);
        let Some(position) = position else {
            panic!("finishing window {} which is not open", window.0);
        };
        let (_, owner) = state.open.remove(position);
        assert_eq!(owner, package.number, "window finished on the wrong package");

        state
            .finished
            .entry(package.number)
            .or_default()
            .push(window.0);

        if state.fail_finish.remove(&package.number) {
            return Err(Error::Call {
                symbol: "PGSample_GetIAPower",
            });
        }

        let mut sample = sample_for(package);
        if state.short_core_vectors.contains(&package.number) {
            sample.ia_core_utilization.pop();
        }
        Ok(sample)
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        self.state.borrow_mut().shutdowns += 1;
        Ok(())
    }
}

/// A package with the static attributes used across the tests; frequencies
/// are in kilohertz, matching what the native layer hands over.
pub(crate) fn package(number: i32, cores: i32) -> Package {
    Package {
        number,
        cores,
        ia_base_frequency: 2_400_000.0,
        ia_max_frequency: 4_200_000.0,
        gt_max_frequency: 1_150_000.0,
        tdp: 65.0,
        max_temperature: 100.0,
    }
}

pub(crate) fn sample_for(package: &Package) -> Sample {
    let cores = usize::try_from(package.cores).unwrap_or_default();
    Sample {
        ia_frequency: Measure {
            mean: 3_000_000.0,
            min: 1_200_000.0,
            max: 4_200_000.0,
        },
        ia_frequency_request: Measure {
            mean: 3_100_000.0,
            min: 1_200_000.0,
            max: 4_200_000.0,
        },
        ia_temperature: Measure {
            mean: 55.0,
            min: 40.0,
            max: 70.0,
        },
        ia_power: Power {
            watts: 28.5,
            joules: 285.0,
        },
        ia_utilization: 42.0,
        gt_frequency: 950_000.0,
        gt_frequency_request: 1_000_000.0,
        gt_utilization: 12.0,
        package_power: Power {
            watts: 35.0,
            joules: 350.0,
        },
        platform_power: Power {
            watts: 50.0,
            joules: 500.0,
        },
        dram_power: Power {
            watts: 4.2,
            joules: 42.0,
        },
        package_temperature: 58.0,
        tdp: 65.0,
        ia_core_frequency: vec![
            Measure {
                mean: 2_800_000.0,
                min: 800_000.0,
                max: 4_200_000.0,
            };
            cores
        ],
        ia_core_frequency_request: vec![
            Measure {
                mean: 2_900_000.0,
                min: 800_000.0,
                max: 4_200_000.0,
            };
            cores
        ],
        ia_core_temperature: vec![
            Measure {
                mean: 52.0,
                min: 40.0,
                max: 68.0,
            };
            cores
        ],
        ia_core_utilization: vec![37.5; cores],
    }
}
