//! Terminal output: a status spinner with narrative lines printed above it.
//!
//! Uses `indicatif` for the spinner and `console` for colored verdicts. When
//! stdout is not a terminal the spinner stays hidden and lines are printed
//! plainly, so piped output is unchanged.

use console::{Style, Term};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::job::JobStatus;
use crate::monitor::{FailureReason, Outcome};
use crate::sink::Sink;

/// Visual progress for one supervised job.
pub struct JobProgress {
    pb: ProgressBar,
    label: String,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    /// Starts the spinner for the named job.
    pub fn start(label: &str) -> Self {
        let pb = if Term::stdout().is_term() {
            let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(format!("{label}: submitting"));

        Self {
            pb,
            label: label.to_string(),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Stops the spinner and prints the final verdict.
    pub fn complete(&self, outcome: &Outcome) {
        self.pb.finish_and_clear();
        match outcome {
            Outcome::Success { exit_code } => {
                println!(
                    "  {} {} succeeded (exit code {exit_code})",
                    self.green.apply_to("✓"),
                    self.label
                );
            }
            Outcome::Failure {
                reason: FailureReason::Canceled,
                ..
            } => {
                println!("  {} {} canceled", self.yellow.apply_to("■"), self.label);
            }
            Outcome::Failure { reason, .. } => {
                println!("  {} {} failed: {reason}", self.red.apply_to("✗"), self.label);
            }
        }
    }

    /// Stops the spinner without a verdict (supervision itself failed).
    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }
}

impl Sink for JobProgress {
    fn line(&mut self, line: &str) {
        if self.pb.is_hidden() {
            println!("{line}");
        } else {
            self.pb.println(line);
        }
    }

    fn status(&mut self, status: JobStatus) {
        let styled = match status {
            JobStatus::Succeeded => self.green.apply_to(status.to_string()),
            JobStatus::Failed => self.red.apply_to(status.to_string()),
            _ => self.yellow.apply_to(status.to_string()),
        };
        self.pb.set_message(format!("{}: {styled}", self.label));
    }
}
