use aws_config::SdkConfig;
use aws_sdk_batch::Client;

use super::BatchClient;
use super::error::AwsError;
use super::types::{
    SubmissionResult, SubmitJobRequest, observation_from, sdk_overrides, sdk_retry_strategy,
};
use crate::job::JobObservation;

/// AWS Batch client backed by the official SDK.
pub struct HttpBatchClient {
    client: Client,
}

impl HttpBatchClient {
    /// Builds a client from a loaded SDK configuration. `endpoint` replaces
    /// the regional Batch endpoint (useful for testing).
    pub fn new(sdk: &SdkConfig, endpoint: Option<&str>) -> Self {
        let mut conf = aws_sdk_batch::config::Builder::from(sdk);
        if let Some(url) = endpoint {
            conf = conf.endpoint_url(url);
        }
        Self {
            client: Client::from_conf(conf.build()),
        }
    }
}

impl BatchClient for HttpBatchClient {
    async fn submit(&self, request: &SubmitJobRequest) -> Result<SubmissionResult, AwsError> {
        let mut call = self
            .client
            .submit_job()
            .job_name(&request.job_name)
            .job_queue(&request.job_queue)
            .job_definition(&request.job_definition);
        for (key, value) in &request.parameters {
            call = call.parameters(key, value);
        }
        if let Some(overrides) = &request.container_overrides {
            call = call.container_overrides(sdk_overrides(overrides)?);
        }
        if let Some(retry) = request.retry_strategy {
            call = call.retry_strategy(sdk_retry_strategy(retry)?);
        }

        let out = call.send().await.map_err(AwsError::from_sdk)?;
        let result = SubmissionResult::try_from(&out)?;
        tracing::info!(job_id = %result.job_id, job_name = %result.job_name, "Job submitted");
        Ok(result)
    }

    async fn describe(&self, job_id: &str) -> Result<JobObservation, AwsError> {
        let out = self
            .client
            .describe_jobs()
            .jobs(job_id)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        let detail = out
            .jobs()
            .iter()
            .find(|j| j.job_id() == Some(job_id))
            .ok_or_else(|| AwsError::JobNotFound(job_id.to_string()))?;
        observation_from(detail)
    }

    async fn terminate(&self, job_id: &str, reason: &str) -> Result<(), AwsError> {
        self.client
            .terminate_job()
            .job_id(job_id)
            .reason(reason)
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::types::{ContainerOverrides, KeyValuePair, RetryStrategy};
    use crate::job::JobStatus;
    use crate::test_support::sdk_config;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_json, body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpBatchClient {
        HttpBatchClient::new(&sdk_config(), Some(&server.uri()))
    }

    fn request() -> SubmitJobRequest {
        SubmitJobRequest {
            job_name: "job1".into(),
            job_queue: "q1".into(),
            job_definition: "def1".into(),
            parameters: BTreeMap::new(),
            container_overrides: None,
            retry_strategy: None,
        }
    }

    #[tokio::test]
    async fn submit_posts_signed_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/submitjob"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(body_partial_json(serde_json::json!({
                "jobName": "job1", "jobQueue": "q1", "jobDefinition": "def1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobArn": "arn:aws:batch:us-east-1:123:job/abc123",
                "jobName": "job1",
                "jobId": "abc123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).submit(&request()).await.unwrap();
        assert_eq!(result.job_id, "abc123");
        assert_eq!(result.job_name, "job1");
        assert!(result.job_arn.is_some());
    }

    #[tokio::test]
    async fn submit_sends_overrides_and_retry_strategy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/submitjob"))
            .and(body_partial_json(serde_json::json!({
                "parameters": {"date": "2024-01-01"},
                "containerOverrides": {
                    "command": ["echo", "hi"],
                    "vcpus": 1,
                    "memory": 512,
                    "environment": [{"name": "MODE", "value": "fast"}]
                },
                "retryStrategy": {"attempts": 3}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobName": "job1",
                "jobId": "abc123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = SubmitJobRequest {
            parameters: BTreeMap::from([("date".to_string(), "2024-01-01".to_string())]),
            container_overrides: Some(ContainerOverrides {
                command: Some(vec!["echo".into(), "hi".into()]),
                vcpus: Some(1),
                memory: Some(512),
                environment: Some(vec![KeyValuePair {
                    name: "MODE".into(),
                    value: "fast".into(),
                }]),
            }),
            retry_strategy: Some(RetryStrategy { attempts: 3 }),
            ..request()
        };
        let result = client(&server).submit(&request).await.unwrap();
        assert_eq!(result.job_id, "abc123");
        assert_eq!(result.job_arn, None);
    }

    #[tokio::test]
    async fn submit_rejection_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/submitjob"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "__type": "ClientException",
                "message": "JobQueue q1 not found"
            })))
            .mount(&server)
            .await;

        let err = client(&server).submit(&request()).await.unwrap_err();
        match err {
            AwsError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("ClientException"));
                assert_eq!(message, "JobQueue q1 not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn describe_returns_observation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/describejobs"))
            .and(body_json(serde_json::json!({"jobs": ["abc123"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobs": [{
                    "jobId": "abc123",
                    "jobName": "job1",
                    "status": "SUCCEEDED",
                    "attempts": [{"container": {"exitCode": 0, "logStreamName": "s1"}}]
                }]
            })))
            .mount(&server)
            .await;

        let obs = client(&server).describe("abc123").await.unwrap();
        assert_eq!(obs.status, JobStatus::Succeeded);
        assert_eq!(obs.exit_code(), Some(0));
        assert_eq!(obs.log_stream(), Some("s1"));
    }

    #[tokio::test]
    async fn describe_unknown_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/describejobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobs": [{"jobId": "abc123", "jobName": "job1", "status": "PAUSED"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server).describe("abc123").await.unwrap_err();
        assert!(matches!(err, AwsError::UnknownStatus(ref s) if s == "PAUSED"));
    }

    #[tokio::test]
    async fn describe_reads_latest_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/describejobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jobs": [{
                    "jobId": "abc123",
                    "jobName": "job1",
                    "status": "FAILED",
                    "statusReason": "Essential container in task exited",
                    "attempts": [
                        {"container": {"exitCode": 3, "logStreamName": "def1/default/xyz"},
                         "startedAt": 1700000000000i64, "stoppedAt": 1700000005000i64},
                        {"statusReason": "Host EC2 terminated"}
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let obs = client(&server).describe("abc123").await.unwrap();
        assert_eq!(obs.status, JobStatus::Failed);
        assert_eq!(obs.attempt_count(), 2);
        // The last attempt never reported container details.
        assert_eq!(obs.exit_code(), None);
        assert_eq!(
            obs.status_reason.as_deref(),
            Some("Essential container in task exited")
        );
    }

    #[tokio::test]
    async fn describe_missing_job_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/describejobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"jobs": []})))
            .mount(&server)
            .await;

        let err = client(&server).describe("gone").await.unwrap_err();
        assert!(matches!(err, AwsError::JobNotFound(ref id) if id == "gone"));
    }

    #[tokio::test]
    async fn describe_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/describejobs"))
            .respond_with(ResponseTemplate::new(503).set_body_string(""))
            .mount(&server)
            .await;

        let err = client(&server).describe("abc123").await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("unknown error"));
    }

    #[tokio::test]
    async fn terminate_sends_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/terminatejob"))
            .and(body_json(serde_json::json!({
                "jobId": "abc123", "reason": "Terminated by batchwatch"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .terminate("abc123", "Terminated by batchwatch")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/submitjob"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).submit(&request()).await.unwrap_err();
        assert!(matches!(err, AwsError::Decode(_)));
    }
}
