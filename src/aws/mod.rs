//! Remote collaborators: the batch job service and the log store.
//!
//! The monitor depends only on the [`BatchClient`] and [`LogStore`] traits;
//! [`HttpBatchClient`] and [`HttpLogStore`] are the AWS SDK implementations.

pub mod client;
pub mod error;
pub mod logs;
pub mod types;

pub use client::HttpBatchClient;
pub use error::AwsError;
pub use logs::HttpLogStore;
pub use types::{LogLine, LogPage, SubmissionResult, SubmitJobRequest};

use crate::job::JobObservation;

/// Submit, describe and terminate jobs on the remote service.
#[allow(async_fn_in_trait)]
pub trait BatchClient {
    async fn submit(&self, request: &SubmitJobRequest) -> Result<SubmissionResult, AwsError>;

    async fn describe(&self, job_id: &str) -> Result<JobObservation, AwsError>;

    async fn terminate(&self, job_id: &str, reason: &str) -> Result<(), AwsError>;
}

/// Read a log stream page by page, starting from the oldest event.
#[allow(async_fn_in_trait)]
pub trait LogStore {
    async fn fetch_page(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
    ) -> Result<LogPage, AwsError>;
}
