//! Errors raised while talking to AWS Batch or CloudWatch Logs.

use aws_sdk_batch::config::http::HttpResponse;
use aws_sdk_batch::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Errors that can occur on a single remote call.
#[derive(Debug, Error)]
pub enum AwsError {
    /// The service answered with a non-2xx status.
    /// `code` carries the service's `__type` when it sent one.
    #[error("API error (status {status}{}): {message}", fmt_code(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// DNS, connection or timeout failure below the HTTP layer.
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx response whose body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// `DescribeJobs` answered without the requested job.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// The job reported a status value this client does not recognise.
    #[error("unrecognised job status '{0}'")]
    UnknownStatus(String),

    /// The request could not be expressed in the service's types.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn fmt_code(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(", {c}")).unwrap_or_default()
}

impl AwsError {
    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AwsError::Api { status, .. } => *status == 429 || *status >= 500,
            AwsError::Network(_) => true,
            AwsError::Decode(_)
            | AwsError::JobNotFound(_)
            | AwsError::UnknownStatus(_)
            | AwsError::InvalidRequest(_) => false,
        }
    }

    /// Maps an SDK failure from either service client.
    pub(crate) fn from_sdk<E>(err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        match &err {
            // A 2xx whose body failed to deserialize.
            SdkError::ServiceError(ctx) if ctx.raw().status().is_success() => {
                AwsError::Decode(DisplayErrorContext(&err).to_string())
            }
            SdkError::ServiceError(ctx) => AwsError::Api {
                status: ctx.raw().status().as_u16(),
                code: ctx.err().code().map(str::to_string),
                message: ctx.err().message().unwrap_or("unknown error").to_string(),
            },
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                AwsError::Network(DisplayErrorContext(&err).to_string())
            }
            SdkError::ConstructionFailure(_) => {
                AwsError::InvalidRequest(DisplayErrorContext(&err).to_string())
            }
            _ => AwsError::Decode(DisplayErrorContext(&err).to_string()),
        }
    }
}
