use aws_config::SdkConfig;
use aws_sdk_cloudwatchlogs::Client;

use super::LogStore;
use super::error::AwsError;
use super::types::LogPage;

/// CloudWatch Logs reader built on `GetLogEvents`.
pub struct HttpLogStore {
    client: Client,
}

impl HttpLogStore {
    /// Builds a store from a loaded SDK configuration. `endpoint` replaces
    /// the regional Logs endpoint (useful for testing).
    pub fn new(sdk: &SdkConfig, endpoint: Option<&str>) -> Self {
        let mut conf = aws_sdk_cloudwatchlogs::config::Builder::from(sdk);
        if let Some(url) = endpoint {
            conf = conf.endpoint_url(url);
        }
        Self {
            client: Client::from_conf(conf.build()),
        }
    }
}

impl LogStore for HttpLogStore {
    async fn fetch_page(
        &self,
        group: &str,
        stream: &str,
        next_token: Option<&str>,
    ) -> Result<LogPage, AwsError> {
        let out = self
            .client
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .start_from_head(true)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(AwsError::from_sdk)?;
        tracing::debug!(stream, events = out.events().len(), "Fetched log page");
        Ok(LogPage::from(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::test_support::sdk_config;

    fn store(server: &MockServer) -> HttpLogStore {
        HttpLogStore::new(&sdk_config(), Some(&server.uri()))
    }

    #[tokio::test]
    async fn fetch_page_reads_from_head() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-amz-target", "Logs_20140328.GetLogEvents"))
            .and(header("content-type", "application/x-amz-json-1.1"))
            .and(body_partial_json(serde_json::json!({
                "logGroupName": "/aws/batch/job",
                "logStreamName": "s1",
                "startFromHead": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "events": [
                    {"timestamp": 1700000000000i64, "message": "hello", "ingestionTime": 1700000000100i64},
                    {"timestamp": 1700000001000i64, "message": "world", "ingestionTime": 1700000001100i64}
                ],
                "nextForwardToken": "f/2",
                "nextBackwardToken": "b/0"
            })))
            .mount(&server)
            .await;

        let page = store(&server)
            .fetch_page("/aws/batch/job", "s1", None)
            .await
            .unwrap();
        assert_eq!(page.lines.len(), 2);
        assert_eq!(page.lines[1].message, "world");
        assert_eq!(page.lines[0].timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(page.next_token.as_deref(), Some("f/2"));
    }

    #[tokio::test]
    async fn fetch_page_passes_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"nextToken": "f/2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "events": [], "nextForwardToken": "f/2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = store(&server)
            .fetch_page("/aws/batch/job", "s1", Some("f/2"))
            .await
            .unwrap();
        assert!(page.lines.is_empty());
    }

    #[tokio::test]
    async fn missing_stream_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "__type": "ResourceNotFoundException",
                "message": "The specified log stream does not exist."
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .fetch_page("/aws/batch/job", "missing", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ResourceNotFoundException"));
    }
}
