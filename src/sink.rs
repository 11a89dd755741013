//! Output consumers for the human-readable job narrative.

use chrono::{DateTime, Utc};

use crate::job::JobStatus;

/// Ordered consumer of narrative lines (progress, exit code, log output).
pub trait Sink {
    fn line(&mut self, line: &str);

    /// Notified whenever the job's status changes. Defaults to a no-op.
    fn status(&mut self, _status: JobStatus) {}
}

/// Collects lines in memory.
impl Sink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Formats a UTC instant as `YYYY-MM-DD HH:MM:SS.mmm`.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}
