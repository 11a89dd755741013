use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote lifecycle status of a batch job.
///
/// SUBMITTED → PENDING → RUNNABLE → STARTING → RUNNING → SUCCEEDED | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    Pending,
    Runnable,
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Parses the wire representation. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUBMITTED" => Some(Self::Submitted),
            "PENDING" => Some(Self::Pending),
            "RUNNABLE" => Some(Self::Runnable),
            "STARTING" => Some(Self::Starting),
            "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// SUCCEEDED and FAILED are absorbing; everything else must be re-polled.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::Pending => "PENDING",
            Self::Runnable => "RUNNABLE",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Container details reported for an attempt once it has started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptContainer {
    pub exit_code: Option<i32>,
    pub log_stream_name: Option<String>,
    pub reason: Option<String>,
}

/// One execution try of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attempt {
    /// `None` until the attempt's container has reported anything.
    pub container: Option<AttemptContainer>,
}

/// A single snapshot of a job's remote state, produced fresh by every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobObservation {
    pub job_id: String,
    pub status: JobStatus,
    pub status_reason: Option<String>,
    pub attempts: Vec<Attempt>,
}

impl JobObservation {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn latest_container(&self) -> Option<&AttemptContainer> {
        self.attempts.last().and_then(|a| a.container.as_ref())
    }

    /// Exit code of the most recent attempt, if its container reported one.
    pub fn exit_code(&self) -> Option<i32> {
        self.latest_container().and_then(|c| c.exit_code)
    }

    /// Log stream of the most recent attempt. Empty names count as absent.
    pub fn log_stream(&self) -> Option<&str> {
        self.latest_container()
            .and_then(|c| c.log_stream_name.as_deref())
            .filter(|s| !s.is_empty())
    }
}
