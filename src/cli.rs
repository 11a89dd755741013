//! batchwatch command line interface built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (run, render, watch,
//! terminate) and global flags (--config, --region, --poll-interval, --verbose).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::job::RawJobSpec;

/// batchwatch: run a container job on AWS Batch and follow it to completion.
#[derive(Debug, Parser)]
#[command(name = "batchwatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file (default: ./batchwatch.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// AWS region, overriding the config file and environment.
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Seconds between status polls.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: Option<u64>,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a job and supervise it until it finishes.
    Run(JobArgs),

    /// Print the submission request for a job without submitting it.
    Render(JobArgs),

    /// Supervise an already submitted job.
    Watch {
        /// Identifier returned by SubmitJob.
        job_id: String,
    },

    /// Request termination of a job.
    Terminate {
        job_id: String,

        /// Reason recorded with the termination.
        #[arg(long)]
        reason: Option<String>,
    },
}

/// Job description, from a job file, flags, or both (flags win).
#[derive(Debug, Clone, Default, Args)]
pub struct JobArgs {
    /// TOML job file.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Job name.
    #[arg(long)]
    pub name: Option<String>,

    /// Job definition name, name:revision, or ARN.
    #[arg(long)]
    pub definition: Option<String>,

    /// Job queue name or ARN.
    #[arg(long)]
    pub queue: Option<String>,

    /// Command override, split on whitespace. Blank keeps the definition's command.
    #[arg(long, allow_hyphen_values = true)]
    pub command: Option<String>,

    /// vCPU override.
    #[arg(long)]
    pub vcpu: Option<String>,

    /// Memory override in MiB.
    #[arg(long)]
    pub memory: Option<String>,

    /// Number of attempts in the retry strategy.
    #[arg(long)]
    pub retries: Option<String>,

    /// Job parameter substituted into the definition's command (repeatable).
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Container environment variable (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
}

impl JobArgs {
    /// Merges the job file (if any) with flag overrides.
    pub fn into_raw(self) -> Result<RawJobSpec> {
        let mut raw = match &self.file {
            Some(path) => RawJobSpec::load(path)?,
            None => RawJobSpec::default(),
        };
        if let Some(name) = self.name {
            raw.name = name;
        }
        if let Some(definition) = self.definition {
            raw.definition = definition;
        }
        if let Some(queue) = self.queue {
            raw.queue = queue;
        }
        if let Some(command) = self.command {
            raw.command = command;
        }
        if let Some(vcpu) = self.vcpu {
            raw.vcpu = Some(vcpu.as_str().into());
        }
        if let Some(memory) = self.memory {
            raw.memory = Some(memory.as_str().into());
        }
        if let Some(retries) = self.retries {
            raw.retries = Some(retries.as_str().into());
        }
        raw.parameters.extend(self.params);
        raw.environment.extend(self.env);
        Ok(raw)
    }
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
