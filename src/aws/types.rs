//! The submission request as batchwatch builds and echoes it, plus the
//! domain handles the rest of the crate works with.
//!
//! Request structs serialize in the camelCase shape of the Batch `SubmitJob`
//! API and omit every optional field that is `None`, so job definition
//! defaults apply on the remote side. Conversions to and from the SDK's
//! types live here as well.

use std::collections::BTreeMap;

use aws_sdk_batch::operation::submit_job::SubmitJobOutput;
use aws_sdk_batch::types as batch;
use aws_sdk_cloudwatchlogs::operation::get_log_events::GetLogEventsOutput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AwsError;
use crate::job::{Attempt, AttemptContainer, JobObservation, JobStatus};

/// Body of `POST /v1/submitjob`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    pub job_name: String,
    pub job_queue: String,
    pub job_definition: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_overrides: Option<ContainerOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_strategy: Option<RetryStrategy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Vec<KeyValuePair>>,
}

impl ContainerOverrides {
    pub fn is_empty(&self) -> bool {
        self.command.is_none()
            && self.vcpus.is_none()
            && self.memory.is_none()
            && self.environment.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryStrategy {
    pub attempts: u32,
}

/// Handle for a job the service accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub job_id: String,
    pub job_name: String,
    pub job_arn: Option<String>,
}

impl TryFrom<&SubmitJobOutput> for SubmissionResult {
    type Error = AwsError;

    fn try_from(out: &SubmitJobOutput) -> Result<Self, AwsError> {
        let job_id = out
            .job_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AwsError::Decode("SubmitJob response has no jobId".into()))?;
        Ok(Self {
            job_id: job_id.to_string(),
            job_name: out.job_name().unwrap_or_default().to_string(),
            job_arn: out.job_arn().map(str::to_string),
        })
    }
}

/// One event from a log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// One page of log events. `next_token` is the forward token for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    pub lines: Vec<LogLine>,
    pub next_token: Option<String>,
}

impl From<&GetLogEventsOutput> for LogPage {
    fn from(out: &GetLogEventsOutput) -> Self {
        let lines = out
            .events()
            .iter()
            .map(|e| LogLine {
                timestamp: e
                    .timestamp()
                    .and_then(DateTime::from_timestamp_millis)
                    .unwrap_or_default(),
                message: e.message().unwrap_or_default().to_string(),
            })
            .collect();
        Self {
            lines,
            next_token: out.next_forward_token().map(str::to_string),
        }
    }
}

/// Reads a `DescribeJobs` entry, rejecting status values this client does
/// not know.
pub fn observation_from(detail: &batch::JobDetail) -> Result<JobObservation, AwsError> {
    let raw = detail.status().map(|s| s.as_str()).unwrap_or_default();
    let status = JobStatus::parse(raw).ok_or_else(|| AwsError::UnknownStatus(raw.to_string()))?;
    let attempts = detail
        .attempts()
        .iter()
        .map(|a| Attempt {
            container: a.container().map(|c| AttemptContainer {
                exit_code: c.exit_code(),
                log_stream_name: c.log_stream_name().map(str::to_string),
                reason: c.reason().map(str::to_string),
            }),
        })
        .collect();
    Ok(JobObservation {
        job_id: detail.job_id().unwrap_or_default().to_string(),
        status,
        status_reason: detail.status_reason().map(str::to_string),
        attempts,
    })
}

/// Overrides in the SDK's shape. `vcpus` and `memory` are the legacy
/// container fields the echoed request uses.
#[allow(deprecated)]
pub(crate) fn sdk_overrides(o: &ContainerOverrides) -> Result<batch::ContainerOverrides, AwsError> {
    let environment = o.environment.as_ref().map(|env| {
        env.iter()
            .map(|kv| {
                batch::KeyValuePair::builder()
                    .name(&kv.name)
                    .value(&kv.value)
                    .build()
            })
            .collect()
    });
    Ok(batch::ContainerOverrides::builder()
        .set_command(o.command.clone())
        .set_vcpus(o.vcpus.map(|v| to_i32("vcpus", v)).transpose()?)
        .set_memory(o.memory.map(|m| to_i32("memory", m)).transpose()?)
        .set_environment(environment)
        .build())
}

pub(crate) fn sdk_retry_strategy(r: RetryStrategy) -> Result<batch::RetryStrategy, AwsError> {
    Ok(batch::RetryStrategy::builder()
        .attempts(to_i32("attempts", r.attempts)?)
        .build())
}

fn to_i32(field: &str, value: u32) -> Result<i32, AwsError> {
    i32::try_from(value)
        .map_err(|_| AwsError::InvalidRequest(format!("{field} {value} is out of range")))
}
