use thiserror::Error;

use crate::aws::AwsError;
use crate::job::JobStatus;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid job spec: {0}")]
    InvalidSpec(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Job submission rejected: {0}")]
    Submission(#[source] AwsError),

    #[error("Failed to query job status: {0}")]
    TransientQuery(#[source] AwsError),

    #[error("Unexpected response from the batch service: {0}")]
    Protocol(String),

    #[error("Job {job_id} failed before any attempts began")]
    NoAttempt { job_id: String },

    #[error("Job {job_id} ran but was not successful (status {status}, exit code {})", fmt_exit_code(.exit_code))]
    JobFailure {
        job_id: String,
        status: JobStatus,
        exit_code: Option<i32>,
    },

    #[error("Job {job_id} was canceled and termination was requested")]
    Canceled { job_id: String },

    #[error("Remote call failed: {0}")]
    Aws(#[from] AwsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn fmt_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

pub type Result<T> = std::result::Result<T, BatchError>;
