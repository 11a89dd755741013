//! Configuration loaded from `batchwatch.toml`.
//!
//! [`BatchwatchConfig`] holds every tunable. Keys missing from the file use
//! sensible defaults. `AWS_REGION` / `AWS_DEFAULT_REGION` take precedence
//! over the file for the region. Credentials come from the AWS SDK's default
//! provider chain unless the file opts out with static keys.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_batch::config::Credentials;
use serde::Deserialize;

use crate::error::BatchError;
use crate::monitor::MonitorSettings;

pub const DEFAULT_CONFIG_FILE: &str = "batchwatch.toml";

/// Region used when neither the file, the environment nor an AWS profile names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Top-level configuration loaded from `batchwatch.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchwatchConfig {
    /// AWS region. Falls back to the SDK's region chain, then `us-east-1`.
    #[serde(default)]
    pub region: Option<String>,

    /// Resolve credentials through the SDK's default chain (environment,
    /// profiles, SSO, container and instance roles) instead of this file.
    #[serde(default = "default_use_default_credentials")]
    pub use_default_credentials: bool,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default)]
    pub session_token: Option<String>,

    /// Seconds between status polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// CloudWatch log group that holds job output.
    #[serde(default = "default_log_group")]
    pub log_group: String,

    /// Override for the Batch endpoint URL.
    #[serde(default)]
    pub batch_endpoint: Option<String>,

    /// Override for the CloudWatch Logs endpoint URL.
    #[serde(default)]
    pub logs_endpoint: Option<String>,

    /// Consecutive transient describe failures tolerated before giving up.
    #[serde(default)]
    pub max_describe_failures: u32,

    /// Polls allowed after cancellation before giving up on a final status.
    #[serde(default = "default_termination_grace_polls")]
    pub termination_grace_polls: u32,

    /// Reason attached to termination requests.
    #[serde(default = "default_terminate_reason")]
    pub terminate_reason: String,
}

fn default_use_default_credentials() -> bool {
    true
}

// 15 seconds between polls.
fn default_poll_interval_secs() -> u64 {
    15
}

fn default_log_group() -> String {
    "/aws/batch/job".to_string()
}

// 40 polls, ten minutes at the default interval.
fn default_termination_grace_polls() -> u32 {
    40
}

fn default_terminate_reason() -> String {
    "Terminated by batchwatch".to_string()
}

impl Default for BatchwatchConfig {
    fn default() -> Self {
        Self {
            region: None,
            use_default_credentials: default_use_default_credentials(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            poll_interval_secs: default_poll_interval_secs(),
            log_group: default_log_group(),
            batch_endpoint: None,
            logs_endpoint: None,
            max_describe_failures: 0,
            termination_grace_polls: default_termination_grace_polls(),
            terminate_reason: default_terminate_reason(),
        }
    }
}

impl BatchwatchConfig {
    /// Loads `batchwatch.toml` from the current directory, or defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from `path`, which must exist when given.
    /// Without a path, behaves like [`BatchwatchConfig::load`].
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::read(path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str::<BatchwatchConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Environment takes precedence over the file for the region.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(region) = ["AWS_REGION", "AWS_DEFAULT_REGION"]
            .into_iter()
            .filter_map(&env)
            .find(|r| !r.is_empty())
        {
            self.region = Some(region);
        }
    }

    /// Static credentials from this file. `None` defers to the SDK's default
    /// provider chain.
    pub fn static_credentials(&self) -> std::result::Result<Option<Credentials>, BatchError> {
        if self.use_default_credentials {
            return Ok(None);
        }
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        match (
            non_empty(&self.access_key_id),
            non_empty(&self.secret_access_key),
        ) {
            (Some(key), Some(secret)) => Ok(Some(Credentials::new(
                key,
                secret,
                non_empty(&self.session_token),
                None,
                "batchwatch-config",
            ))),
            _ => Err(BatchError::Config(
                "access_key_id and secret_access_key are required when use_default_credentials = false"
                    .into(),
            )),
        }
    }

    /// Loads the shared AWS SDK configuration for this run.
    pub async fn sdk_config(&self) -> std::result::Result<SdkConfig, BatchError> {
        let region = RegionProviderChain::first_try(self.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(DEFAULT_REGION);
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(credentials) = self.static_credentials()? {
            loader = loader.credentials_provider(credentials);
        }
        Ok(loader.load().await)
    }

    /// Settings for the lifecycle monitor. The poll interval must be positive.
    pub fn monitor_settings(&self) -> std::result::Result<MonitorSettings, BatchError> {
        if self.poll_interval_secs == 0 {
            return Err(BatchError::Config(
                "poll_interval_secs must be a positive integer".into(),
            ));
        }
        Ok(MonitorSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            log_group: self.log_group.clone(),
            terminate_reason: self.terminate_reason.clone(),
            max_describe_failures: self.max_describe_failures,
            termination_grace_polls: self.termination_grace_polls,
        })
    }
}
