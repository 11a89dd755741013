pub mod aws;
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod monitor;
pub mod runner;
pub mod shutdown;
pub mod sink;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use config::BatchwatchConfig;
pub use error::{BatchError, Result};
pub use job::{JobSpec, RawJobSpec, RequestBuilder};
pub use monitor::{FailureReason, LifecycleMonitor, MonitorSettings, Outcome};
pub use runner::{run_job, run_job_with};
pub use sink::Sink;
