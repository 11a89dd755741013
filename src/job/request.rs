use crate::aws::types::{ContainerOverrides, KeyValuePair, RetryStrategy, SubmitJobRequest};
use crate::error::{BatchError, Result};

use super::spec::JobSpec;

/// Turns a [`JobSpec`] into the wire request for `SubmitJob`.
pub struct RequestBuilder;

impl RequestBuilder {
    /// Builds the submission request. Pure: the same spec always yields the
    /// same request, and serializing it yields the same bytes.
    ///
    /// Every override that is absent in the spec is omitted from the request
    /// so the job definition's own defaults apply.
    pub fn build(spec: &JobSpec) -> Result<SubmitJobRequest> {
        for (field, value) in [
            ("name", &spec.name),
            ("definition", &spec.definition),
            ("queue", &spec.queue),
        ] {
            if value.trim().is_empty() {
                return Err(BatchError::InvalidSpec(format!("{field} must not be empty")));
            }
        }
        for (field, value) in [
            ("vcpu", spec.vcpu),
            ("memory", spec.memory_mib),
            ("retries", spec.retry_attempts),
        ] {
            if value == Some(0) {
                return Err(BatchError::InvalidSpec(format!(
                    "{field} must be a positive integer, got 0"
                )));
            }
        }

        let command = match spec.command.first() {
            Some(first) if !first.is_empty() => Some(spec.command.clone()),
            _ => None,
        };

        let environment = if spec.environment.is_empty() {
            None
        } else {
            Some(
                spec.environment
                    .iter()
                    .map(|(name, value)| KeyValuePair {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            )
        };

        let overrides = ContainerOverrides {
            command,
            vcpus: spec.vcpu,
            memory: spec.memory_mib,
            environment,
        };

        Ok(SubmitJobRequest {
            job_name: spec.name.clone(),
            job_queue: spec.queue.clone(),
            job_definition: spec.definition.clone(),
            parameters: spec.parameters.clone(),
            container_overrides: (!overrides.is_empty()).then_some(overrides),
            retry_strategy: spec
                .retry_attempts
                .map(|attempts| RetryStrategy { attempts }),
        })
    }
}
