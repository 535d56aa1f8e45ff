use anyhow::Result;

use super::aggregator::{Aggregator, LogLevel};
use super::config::Config;
use super::record::Record;

/// Handle a check keeps on the Agent: its identity plus the submission
/// callbacks records and log lines flow back through.
pub struct AgentCheck {
    check_id: String,       // corresponding id in the Agent
    aggregator: Aggregator, // submit callbacks

    // configuration fields are made public to mimic their uses in Python checks
    pub init_config: Config, // common configuration for each instance
    pub instance: Config,    // instance specific configuration
}

impl AgentCheck {
    pub fn new(
        check_id: String,
        init_config: Config,
        instance_config: Config,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            check_id,
            aggregator,
            init_config,
            instance: instance_config,
        }
    }

    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    /// Forward one flat record to the Agent pipeline
    pub fn emit(&self, record: &Record) -> Result<()> {
        self.aggregator.submit_record(&self.check_id, record)
    }

    /// Report through the Agent's check log channel
    pub fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        self.aggregator.submit_log(&self.check_id, level, message)
    }
}

/// Lifecycle of a check instance.
///
/// `new` is the factory the Agent loader invokes once per configured
/// instance; an error aborts the instance's startup. `run` is invoked on
/// every collection tick; the Agent serializes the calls. `close` is
/// invoked once at teardown.
pub trait Check: Sized {
    fn new(check: AgentCheck) -> Result<Self>;
    fn run(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}
