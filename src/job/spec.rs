//! Job specifications: the raw, user-facing form and the validated [`JobSpec`].
//!
//! A [`RawJobSpec`] holds text exactly as it came from the command line or a
//! job file. [`JobSpec::parse`] validates it once; the result is never mutated.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::{BatchError, Result};

/// A numeric field that may be written as an integer or a string in a job file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    Text(String),
}

impl RawNumber {
    fn as_text(&self) -> String {
        match self {
            RawNumber::Int(n) => n.to_string(),
            RawNumber::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

/// Unvalidated job description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJobSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub queue: String,
    /// Whitespace separated command override. Blank means "use the definition's command".
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub vcpu: Option<RawNumber>,
    #[serde(default)]
    pub memory: Option<RawNumber>,
    #[serde(default)]
    pub retries: Option<RawNumber>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl RawJobSpec {
    /// Reads a job file in TOML format.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job file {}", path.display()))?;
        let raw = toml::from_str::<RawJobSpec>(&contents)
            .with_context(|| format!("failed to parse job file {}", path.display()))?;
        Ok(raw)
    }
}

/// Validated, immutable description of one job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: String,
    pub definition: String,
    pub queue: String,
    /// Command override tokens. Empty means no override.
    pub command: Vec<String>,
    pub vcpu: Option<u32>,
    pub memory_mib: Option<u32>,
    pub retry_attempts: Option<u32>,
    pub parameters: BTreeMap<String, String>,
    pub environment: BTreeMap<String, String>,
}

impl JobSpec {
    /// Creates a spec with no overrides.
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            queue: queue.into(),
            command: Vec::new(),
            vcpu: None,
            memory_mib: None,
            retry_attempts: None,
            parameters: BTreeMap::new(),
            environment: BTreeMap::new(),
        }
    }

    /// Validates a raw spec.
    ///
    /// Numeric fields accept blank values as "absent"; anything else that is
    /// not a positive integer is rejected with [`BatchError::InvalidSpec`].
    pub fn parse(raw: RawJobSpec) -> Result<Self> {
        let name = required("name", &raw.name)?;
        let definition = required("definition", &raw.definition)?;
        let queue = required("queue", &raw.queue)?;

        Ok(Self {
            name,
            definition,
            queue,
            command: split_command(&raw.command),
            vcpu: parse_positive("vcpu", raw.vcpu.as_ref())?,
            memory_mib: parse_positive("memory", raw.memory.as_ref())?,
            retry_attempts: parse_positive("retries", raw.retries.as_ref())?,
            parameters: raw.parameters,
            environment: raw.environment,
        })
    }
}

/// Splits a raw command on runs of whitespace. A blank command yields no tokens.
pub fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BatchError::InvalidSpec(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn parse_positive(field: &str, value: Option<&RawNumber>) -> Result<Option<u32>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let text = value.as_text();
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<u32>() {
        Ok(0) => Err(BatchError::InvalidSpec(format!(
            "{field} must be a positive integer, got 0"
        ))),
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(BatchError::InvalidSpec(format!(
            "can't parse {field} value '{text}' as a positive integer"
        ))),
    }
}
