//! In-memory [`BatchClient`] and [`LogStore`] doubles for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_batch::config::{Credentials, SharedCredentialsProvider};
use chrono::DateTime;

use crate::aws::{AwsError, BatchClient, LogLine, LogPage, LogStore, SubmissionResult, SubmitJobRequest};
use crate::job::{Attempt, AttemptContainer, JobObservation, JobStatus};

/// One scripted reply to `describe`.
#[derive(Debug, Clone)]
pub enum Step {
    Observe(JobObservation),
    Fail(u16),
    Unknown(&'static str),
}

/// Replays scripted describe results. The last step repeats forever.
pub struct ScriptedBatch {
    steps: Mutex<VecDeque<Step>>,
    pub submitted: Mutex<Vec<SubmitJobRequest>>,
    pub describes: Mutex<u32>,
    pub terminations: Mutex<Vec<(String, String)>>,
    pub reject_submit: bool,
    pub fail_terminate: bool,
}

impl ScriptedBatch {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            submitted: Mutex::new(Vec::new()),
            describes: Mutex::new(0),
            terminations: Mutex::new(Vec::new()),
            reject_submit: false,
            fail_terminate: false,
        }
    }

    pub fn describe_count(&self) -> u32 {
        *self.describes.lock().unwrap()
    }

    pub fn termination_count(&self) -> usize {
        self.terminations.lock().unwrap().len()
    }
}

impl BatchClient for ScriptedBatch {
    async fn submit(&self, request: &SubmitJobRequest) -> Result<SubmissionResult, AwsError> {
        if self.reject_submit {
            return Err(AwsError::Api {
                status: 400,
                code: Some("ClientException".into()),
                message: "queue not found".into(),
            });
        }
        self.submitted.lock().unwrap().push(request.clone());
        Ok(SubmissionResult {
            job_id: "abc123".into(),
            job_name: request.job_name.clone(),
            job_arn: None,
        })
    }

    async fn describe(&self, _job_id: &str) -> Result<JobObservation, AwsError> {
        *self.describes.lock().unwrap() += 1;
        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front().unwrap()
            } else {
                steps.front().cloned().expect("script must not be empty")
            }
        };
        match step {
            Step::Observe(obs) => Ok(obs),
            Step::Fail(status) => Err(AwsError::Api {
                status,
                code: None,
                message: "scripted failure".into(),
            }),
            Step::Unknown(value) => Err(AwsError::UnknownStatus(value.into())),
        }
    }

    async fn terminate(&self, job_id: &str, reason: &str) -> Result<(), AwsError> {
        self.terminations
            .lock()
            .unwrap()
            .push((job_id.to_string(), reason.to_string()));
        if self.fail_terminate {
            return Err(AwsError::Api {
                status: 500,
                code: None,
                message: "terminate failed".into(),
            });
        }
        Ok(())
    }
}

/// Serves fixed pages per stream, or fails every fetch.
pub struct ScriptedLogs {
    pages: Vec<LogPage>,
    fail: bool,
    pub fetches: Mutex<Vec<(String, String, Option<String>)>>,
}

impl ScriptedLogs {
    pub fn with_messages(messages: &[&str]) -> Self {
        let lines = messages
            .iter()
            .enumerate()
            .map(|(i, m)| LogLine {
                timestamp: DateTime::from_timestamp_millis(1_700_000_000_000 + i as i64)
                    .unwrap(),
                message: m.to_string(),
            })
            .collect();
        Self::with_pages(vec![LogPage {
            lines,
            next_token: Some("f/1".into()),
        }])
    }

    /// Pages are served in order; the token returned by the last page repeats.
    pub fn with_pages(pages: Vec<LogPage>) -> Self {
        Self {
            pages,
            fail: false,
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            pages: Vec::new(),
            fail: true,
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

impl LogStore for ScriptedLogs {
    async fn fetch_page(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
    ) -> Result<LogPage, AwsError> {
        let index = {
            let mut fetches = self.fetches.lock().unwrap();
            fetches.push((group.into(), stream.into(), next_token.map(str::to_string)));
            fetches.len() - 1
        };
        if self.fail {
            return Err(AwsError::Api {
                status: 400,
                code: Some("ResourceNotFoundException".into()),
                message: "The specified log stream does not exist.".into(),
            });
        }
        match self.pages.get(index) {
            Some(page) => Ok(page.clone()),
            None => Ok(LogPage {
                lines: Vec::new(),
                next_token: next_token.map(str::to_string),
            }),
        }
    }
}

/// Fixed region and credentials, no retries: one mock response per call.
pub fn sdk_config() -> SdkConfig {
    SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
            "AKIDTEST", "secret", None, None, "test",
        )))
        .retry_config(RetryConfig::disabled())
        .build()
}

pub fn observation(status: JobStatus, attempts: Vec<Attempt>) -> JobObservation {
    JobObservation {
        job_id: "abc123".into(),
        status,
        status_reason: None,
        attempts,
    }
}

pub fn started(exit_code: Option<i32>, stream: Option<&str>) -> Attempt {
    Attempt {
        container: Some(AttemptContainer {
            exit_code,
            log_stream_name: stream.map(str::to_string),
            reason: None,
        }),
    }
}

/// Strips the leading `[timestamp] ` from a narrative line.
pub fn untimed(line: &str) -> &str {
    match line.strip_prefix('[').and_then(|rest| rest.split_once("] ")) {
        Some((_, tail)) => tail,
        None => line,
    }
}
