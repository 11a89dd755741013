use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use batchwatch::aws::BatchClient;
use batchwatch::cli::{Cli, Command};
use batchwatch::monitor::{FailureReason, LifecycleMonitor, Outcome};
use batchwatch::runner::connect;
use batchwatch::shutdown::Shutdown;
use batchwatch::ui::JobProgress;
use batchwatch::{BatchwatchConfig, JobSpec, RequestBuilder};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "batchwatch=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = BatchwatchConfig::load_from(cli.config.as_deref())?;
    if let Some(region) = cli.region {
        config.region = Some(region);
    }
    if let Some(secs) = cli.poll_interval {
        config.poll_interval_secs = secs;
    }

    match cli.command {
        Command::Render(args) => {
            let spec = JobSpec::parse(args.into_raw()?)?;
            let request = RequestBuilder::build(&spec)?;
            println!("{}", serde_json::to_string_pretty(&request)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run(args) => {
            let spec = JobSpec::parse(args.into_raw()?)?;
            let shutdown = Shutdown::install();
            let mut progress = JobProgress::start(&spec.name);
            let result = batchwatch::run_job(&spec, &config, shutdown, &mut progress).await;
            finish(&progress, result)
        }
        Command::Watch { job_id } => {
            let settings = config.monitor_settings()?;
            let (batch, logs) = connect(&config).await?;
            let shutdown = Shutdown::install();
            let mut progress = JobProgress::start(&job_id);
            let result = LifecycleMonitor::new(&batch, &logs, settings, shutdown)
                .supervise(&job_id, &mut progress)
                .await;
            finish(&progress, result)
        }
        Command::Terminate { job_id, reason } => {
            let (batch, _) = connect(&config).await?;
            let reason = reason.unwrap_or_else(|| config.terminate_reason.clone());
            batch.terminate(&job_id, &reason).await?;
            println!("Sent Termination Request for {job_id}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn finish(progress: &JobProgress, result: batchwatch::Result<Outcome>) -> Result<ExitCode> {
    match result {
        Ok(outcome) => {
            progress.complete(&outcome);
            Ok(exit_code_for(&outcome))
        }
        Err(e) => {
            progress.abandon();
            Err(e.into())
        }
    }
}

/// 0 on success, 130 on cancellation, otherwise the job's exit code (or 1).
fn exit_code_for(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Success { .. } => ExitCode::SUCCESS,
        Outcome::Failure {
            reason: FailureReason::Canceled,
            ..
        } => ExitCode::from(130),
        Outcome::Failure {
            exit_code: Some(code),
            ..
        } if (1..=255).contains(code) => ExitCode::from(*code as u8),
        Outcome::Failure { .. } => ExitCode::FAILURE,
    }
}
