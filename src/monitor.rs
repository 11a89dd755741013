//! Lifecycle supervision of a submitted job.
//!
//! [`LifecycleMonitor::supervise`] polls the job until it reaches SUCCEEDED or
//! FAILED, narrates status changes to a [`Sink`], reacts to cancellation by
//! requesting remote termination, and finally pulls the last attempt's logs.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::aws::{AwsError, BatchClient, LogStore};
use crate::error::{BatchError, Result};
use crate::job::{JobObservation, JobStatus};
use crate::shutdown::Shutdown;
use crate::sink::{Sink, timestamp};

const LOG_HEADER: &str = "Fetching logs from cloudwatch logs for final attempt...";
const LOG_RULE: &str = "-------------------------------------------------------";

/// Upper bound on `GetLogEvents` pages read for one stream.
const MAX_LOG_PAGES: usize = 10_000;

/// Tuning for one supervision run.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Delay between consecutive status polls.
    pub poll_interval: Duration,
    /// Log group holding the job's container output.
    pub log_group: String,
    /// Reason attached to the termination request sent on cancellation.
    pub terminate_reason: String,
    /// Consecutive transient describe failures tolerated before aborting.
    pub max_describe_failures: u32,
    /// Extra polls allowed after cancellation to observe the final status.
    pub termination_grace_polls: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            log_group: "/aws/batch/job".to_string(),
            terminate_reason: "Terminated by batchwatch".to_string(),
            max_describe_failures: 0,
            termination_grace_polls: 40,
        }
    }
}

/// Why a supervised job did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The job ended without ever starting an attempt.
    NoAttempt,
    /// The last attempt never reported an exit code.
    MissingExitCode,
    /// The job ran but was not SUCCEEDED with exit code 0.
    JobFailed,
    /// Supervision was canceled locally and termination was requested.
    Canceled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoAttempt => write!(f, "failed before any attempts began"),
            FailureReason::MissingExitCode => write!(f, "no exit code was reported"),
            FailureReason::JobFailed => write!(f, "batch ran, but not successful"),
            FailureReason::Canceled => write!(f, "canceled"),
        }
    }
}

/// Final verdict of a supervision run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        exit_code: i32,
    },
    Failure {
        exit_code: Option<i32>,
        status: Option<JobStatus>,
        reason: FailureReason,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Outcome::Success { exit_code } => Some(*exit_code),
            Outcome::Failure { exit_code, .. } => *exit_code,
        }
    }

    /// Collapses the outcome into a single error for callers that only care
    /// about pass/fail.
    pub fn into_result(self, job_id: &str) -> Result<i32> {
        match self {
            Outcome::Success { exit_code } => Ok(exit_code),
            Outcome::Failure {
                reason: FailureReason::Canceled,
                ..
            } => Err(BatchError::Canceled {
                job_id: job_id.to_string(),
            }),
            Outcome::Failure {
                reason: FailureReason::NoAttempt,
                ..
            } => Err(BatchError::NoAttempt {
                job_id: job_id.to_string(),
            }),
            Outcome::Failure {
                exit_code, status, ..
            } => Err(BatchError::JobFailure {
                job_id: job_id.to_string(),
                status: status.unwrap_or(JobStatus::Failed),
                exit_code,
            }),
        }
    }
}

/// Folds a fresh observation over the previous one. Returns the progress line
/// to emit when the status value changed, `None` otherwise.
pub fn transition_line(previous: Option<&JobObservation>, next: &JobObservation) -> Option<String> {
    if previous.is_some_and(|p| p.status == next.status) {
        return None;
    }
    Some(format!(
        "[{}] Attempt {}: {}",
        timestamp(Utc::now()),
        next.attempt_count(),
        next.status
    ))
}

/// Where the polling loop stopped.
struct Polled {
    last: Option<JobObservation>,
    aborted: bool,
}

/// Polls one job to completion.
pub struct LifecycleMonitor<'a, C, L> {
    client: &'a C,
    logs: &'a L,
    settings: MonitorSettings,
    shutdown: Shutdown,
}

impl<'a, C: BatchClient, L: LogStore> LifecycleMonitor<'a, C, L> {
    pub fn new(client: &'a C, logs: &'a L, settings: MonitorSettings, shutdown: Shutdown) -> Self {
        Self {
            client,
            logs,
            settings,
            shutdown,
        }
    }

    /// Supervises `job_id` until it is terminal (or canceled) and returns the outcome.
    ///
    /// Errors are reserved for supervision itself breaking down: describe
    /// failures beyond the configured budget, or a reply this client cannot
    /// interpret. Job failures are reported as [`Outcome::Failure`].
    pub async fn supervise(&self, job_id: &str, sink: &mut impl Sink) -> Result<Outcome> {
        let polled = self.poll(job_id, sink).await?;
        Ok(self.conclude(job_id, polled, sink).await)
    }

    async fn poll(&self, job_id: &str, sink: &mut impl Sink) -> Result<Polled> {
        let mut previous: Option<JobObservation> = None;
        let mut aborted = false;
        let mut failures = 0u32;
        let mut grace_left = self.settings.termination_grace_polls;

        loop {
            match self.client.describe(job_id).await {
                Ok(observation) => {
                    failures = 0;
                    if let Some(line) = transition_line(previous.as_ref(), &observation) {
                        tracing::info!(
                            job_id,
                            status = %observation.status,
                            attempts = observation.attempt_count(),
                            "Job status changed"
                        );
                        sink.status(observation.status);
                        sink.line(&line);
                    }
                    previous = Some(observation);
                }
                Err(e) if aborted => {
                    tracing::warn!(job_id, error = %e, "Describe failed after cancellation");
                    break;
                }
                Err(AwsError::UnknownStatus(value)) => {
                    return Err(BatchError::Protocol(format!(
                        "job {job_id} reported unknown status '{value}'"
                    )));
                }
                Err(AwsError::JobNotFound(id)) => {
                    return Err(BatchError::Protocol(format!(
                        "describe returned no job for id {id}"
                    )));
                }
                Err(e) if e.is_transient() && failures < self.settings.max_describe_failures => {
                    failures += 1;
                    tracing::warn!(
                        job_id,
                        error = %e,
                        failures,
                        max = self.settings.max_describe_failures,
                        "Describe failed, retrying at next poll"
                    );
                }
                Err(e) => return Err(BatchError::TransientQuery(e)),
            }

            if previous.as_ref().is_some_and(JobObservation::is_terminal) {
                break;
            }

            if aborted {
                grace_left = grace_left.saturating_sub(1);
                if grace_left == 0 {
                    tracing::warn!(job_id, "Job still not terminal after cancellation, giving up");
                    break;
                }
                if self.sleep_or(&self.shutdown.force).await {
                    tracing::warn!(job_id, "Stopped waiting for the job's final status");
                    break;
                }
            } else if self.sleep_or(&self.shutdown.cancel).await {
                aborted = true;
                self.request_termination(job_id, sink).await;
                if grace_left == 0 {
                    break;
                }
            }
        }

        Ok(Polled {
            last: previous,
            aborted,
        })
    }

    /// Sleeps for one poll interval. Returns `true` if `token` fired meanwhile.
    async fn sleep_or(&self, token: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = token.cancelled() => true,
            _ = sleep(self.settings.poll_interval) => false,
        }
    }

    async fn request_termination(&self, job_id: &str, sink: &mut impl Sink) {
        match self
            .client
            .terminate(job_id, &self.settings.terminate_reason)
            .await
        {
            Ok(()) => tracing::info!(job_id, "Termination requested"),
            Err(e) => tracing::warn!(job_id, error = %e, "Termination request failed"),
        }
        sink.line(&format!("[{}] Sent Termination Request", timestamp(Utc::now())));
    }

    async fn conclude(&self, job_id: &str, polled: Polled, sink: &mut impl Sink) -> Outcome {
        let Polled { last, aborted } = polled;
        let Some(last) = last else {
            return Outcome::Failure {
                exit_code: None,
                status: None,
                reason: FailureReason::Canceled,
            };
        };

        let canceled = aborted && (last.status == JobStatus::Failed || !last.is_terminal());

        if last.attempts.is_empty() {
            if canceled {
                return Outcome::Failure {
                    exit_code: None,
                    status: Some(last.status),
                    reason: FailureReason::Canceled,
                };
            }
            sink.line("Failed before any attempts began.");
            tracing::warn!(job_id, status = %last.status, "Job ended without any attempts");
            return Outcome::Failure {
                exit_code: None,
                status: Some(last.status),
                reason: FailureReason::NoAttempt,
            };
        }

        let exit_code = last.exit_code();
        match exit_code {
            Some(code) => sink.line(&format!("Finished with exit code {code}")),
            None => sink.line("Finished without an exit code"),
        }

        if let Some(stream) = last.log_stream() {
            self.emit_logs(stream, sink).await;
        }

        let outcome = if canceled {
            Outcome::Failure {
                exit_code,
                status: Some(last.status),
                reason: FailureReason::Canceled,
            }
        } else {
            match (last.status, exit_code) {
                (JobStatus::Succeeded, Some(0)) => Outcome::Success { exit_code: 0 },
                (status, None) => Outcome::Failure {
                    exit_code: None,
                    status: Some(status),
                    reason: FailureReason::MissingExitCode,
                },
                (status, code) => Outcome::Failure {
                    exit_code: code,
                    status: Some(status),
                    reason: FailureReason::JobFailed,
                },
            }
        };
        tracing::info!(job_id, ?outcome, "Supervision finished");
        outcome
    }

    /// Emits the stream's lines; a fetch failure becomes a warning in the narrative.
    async fn emit_logs(&self, stream: &str, sink: &mut impl Sink) {
        sink.line(LOG_HEADER);
        sink.line(LOG_RULE);
        if let Err(e) = self.stream_logs(stream, sink).await {
            tracing::warn!(stream, error = %e, "Log retrieval failed");
            sink.line(&format!(
                "[{}] Fetching '{stream}' failed:",
                timestamp(Utc::now())
            ));
            sink.line(&e.to_string());
        }
    }

    // Pages forward from the head until the forward token repeats. Empty
    // pages can occur mid-stream and do not end it.
    async fn stream_logs(&self, stream: &str, sink: &mut impl Sink) -> std::result::Result<(), AwsError> {
        let mut token: Option<String> = None;
        for _ in 0..MAX_LOG_PAGES {
            let page = self
                .logs
                .fetch_page(&self.settings.log_group, stream, token.as_deref())
                .await?;
            for line in &page.lines {
                sink.line(&format!("[{}] {}", timestamp(line.timestamp), line.message));
            }
            match page.next_token {
                Some(next) if token.as_deref() != Some(next.as_str()) => token = Some(next),
                _ => return Ok(()),
            }
        }
        tracing::warn!(stream, pages = MAX_LOG_PAGES, "Stopped reading logs at the page limit");
        Ok(())
    }
}
