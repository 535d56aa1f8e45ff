//! The check itself: wires the Agent handle and the sampler together.

use anyhow::{Context, Result};

use check_core::{AgentCheck, Check, LogLevel};

use crate::gadget::PowerGadget;
use crate::native::NativeGadget;
use crate::sampler::Sampler;

pub struct PowerGadgetCheck<G: PowerGadget> {
    check: AgentCheck,
    sampler: Sampler<G>,
}

impl<G: PowerGadget> PowerGadgetCheck<G> {
    fn with_gadget(check: AgentCheck, gadget: G) -> Result<Self> {
        let sampler =
            Sampler::initialize(gadget).context("intel_power_gadget initialization failed")?;
        Ok(Self { check, sampler })
    }

    /// One collection cycle: emit every record in order, then report the
    /// per-package failures through the Agent's log channel.
    fn run_cycle(&mut self) -> Result<()> {
        let collection = self.sampler.collect();

        for record in &collection.records {
            self.check.emit(record)?;
        }
        for error in &collection.errors {
            self.check
                .log(LogLevel::Error, &format!("sampling failed: {error}"))?;
        }

        Ok(())
    }
}

impl Check for PowerGadgetCheck<NativeGadget> {
    fn new(check: AgentCheck) -> Result<Self> {
        log::warn!("the intel_power_gadget check is beta");

        let library_path: Option<String> = check.instance.get("library_path").ok();
        let gadget = NativeGadget::open(library_path.as_deref())
            .context("could not open the Intel Power Gadget library")?;

        Self::with_gadget(check, gadget)
    }

    fn run(&mut self) -> Result<()> {
        self.run_cycle()
    }

    fn close(&mut self) -> Result<()> {
        self.sampler.shutdown()?;
        Ok(())
    }
}
