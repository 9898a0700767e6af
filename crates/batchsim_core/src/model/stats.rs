//! Terminal summary of a batch.

use std::fmt;
use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// How a batch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every assignment was computed and delivered
    Completed,
    /// Stopped cleanly on request; `remaining` assignments were never run
    Cancelled { remaining: u64 },
    /// Stopped by an engine or sink fault at `run_index`
    Aborted { run_index: u64, reason: String },
}

impl RunStatus {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Cancelled { remaining } => {
                write!(f, "cancelled with {remaining} runs remaining")
            }
            RunStatus::Aborted { run_index, reason } => {
                write!(f, "aborted at run {run_index}: {reason}")
            }
        }
    }
}

/// Run count, timing and final status of one batch invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Number of records delivered to the sink
    pub total_runs: u64,
    /// Wall time from the first assignment request to the last delivery
    pub elapsed_ms: f64,
    /// Delivered runs per second (0 when no time elapsed)
    pub throughput: f64,
    pub status: RunStatus,
    pub started_at: Timestamp,
}

impl RunStatistics {
    pub(crate) fn new(
        total_runs: u64,
        elapsed: Duration,
        status: RunStatus,
        started_at: Timestamp,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            total_runs as f64 / secs
        } else {
            0.0
        };
        Self {
            total_runs,
            elapsed_ms: secs * 1000.0,
            throughput,
            status,
            started_at,
        }
    }

    /// Human-readable summary, e.g.
    /// `"4 runs requiring 2 milliseconds (2000 runs/s): completed"`
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "{} runs requiring {:.0} milliseconds ({:.0} runs/s): {}",
            self.total_runs, self.elapsed_ms, self.throughput, self.status
        )
    }
}
