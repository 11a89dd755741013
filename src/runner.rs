//! Submit-then-supervise entry points.

use crate::aws::{BatchClient, HttpBatchClient, HttpLogStore, LogStore, SubmitJobRequest};
use crate::config::BatchwatchConfig;
use crate::error::{BatchError, Result};
use crate::job::{JobSpec, RequestBuilder};
use crate::monitor::{LifecycleMonitor, MonitorSettings, Outcome};
use crate::shutdown::Shutdown;
use crate::sink::Sink;

/// Builds the AWS clients described by `config`.
pub async fn connect(config: &BatchwatchConfig) -> Result<(HttpBatchClient, HttpLogStore)> {
    let sdk = config.sdk_config().await?;
    let batch = HttpBatchClient::new(&sdk, config.batch_endpoint.as_deref());
    let logs = HttpLogStore::new(&sdk, config.logs_endpoint.as_deref());
    Ok((batch, logs))
}

/// Submits `spec` against AWS and supervises it to completion.
///
/// The request is built before credentials are resolved, so an invalid
/// spec never touches the network.
pub async fn run_job(
    spec: &JobSpec,
    config: &BatchwatchConfig,
    shutdown: Shutdown,
    sink: &mut impl Sink,
) -> Result<Outcome> {
    let request = RequestBuilder::build(spec)?;
    let settings = config.monitor_settings()?;
    let (batch, logs) = connect(config).await?;
    submit_and_supervise(&batch, &logs, &request, settings, shutdown, sink).await
}

/// Submits `spec` through `client` and supervises the resulting job.
///
/// The request is echoed to `sink` as one JSON line before submission.
/// Spec and submission errors abort before any remote job exists.
pub async fn run_job_with<C: BatchClient, L: LogStore>(
    client: &C,
    logs: &L,
    spec: &JobSpec,
    settings: MonitorSettings,
    shutdown: Shutdown,
    sink: &mut impl Sink,
) -> Result<Outcome> {
    let request = RequestBuilder::build(spec)?;
    submit_and_supervise(client, logs, &request, settings, shutdown, sink).await
}

async fn submit_and_supervise<C: BatchClient, L: LogStore>(
    client: &C,
    logs: &L,
    request: &SubmitJobRequest,
    settings: MonitorSettings,
    shutdown: Shutdown,
    sink: &mut impl Sink,
) -> Result<Outcome> {
    sink.line(&serde_json::to_string(request)?);

    let submitted = client
        .submit(request)
        .await
        .map_err(BatchError::Submission)?;
    sink.line(&format!(
        "Job Submitted: {} ({})",
        submitted.job_id, submitted.job_name
    ));
    tracing::info!(job_id = %submitted.job_id, queue = %request.job_queue, "Supervising job");

    LifecycleMonitor::new(client, logs, settings, shutdown)
        .supervise(&submitted.job_id, sink)
        .await
}
