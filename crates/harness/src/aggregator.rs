//! Result aggregation.
//!
//! Check tasks submit results through a channel and a single collector task
//! owns the run and the counters, so concurrent submission can never lose an
//! update. Counts are only guaranteed accurate after every producer has
//! finished and the channel has closed.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::result::{CheckResult, CheckStatus};
use crate::run::ValidationRun;

/// Running totals per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub passed: u32,
    pub failed: u32,
    pub conditional: u32,
    pub skipped: u32,
}

impl StatusCounts {
    /// Tally one result status.
    pub fn record(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Pass => self.passed += 1,
            CheckStatus::Fail => self.failed += 1,
            CheckStatus::Conditional => self.conditional += 1,
            CheckStatus::Skip => self.skipped += 1,
        }
    }

    /// Recompute totals from a finished result set.
    #[must_use]
    pub fn from_results(results: &[CheckResult]) -> Self {
        let mut counts = Self::default();
        for result in results {
            counts.record(result.status);
        }
        counts
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.conditional + self.skipped
    }
}

/// Overall score: arithmetic mean of `score` across non-skip results,
/// truncated to an integer. An empty (or all-skip) result set scores 0.
#[must_use]
pub fn overall_score(results: &[CheckResult]) -> u8 {
    let mut sum: u64 = 0;
    let mut counted: u64 = 0;
    for result in results {
        if result.counts_toward_score() {
            sum += u64::from(result.score);
            counted += 1;
        }
    }
    if counted == 0 {
        return 0;
    }
    (sum / counted) as u8
}

/// Sender handle check tasks use to submit results.
pub type ResultSender = mpsc::UnboundedSender<CheckResult>;

/// Spawn the single-consumer collector for a run.
///
/// Returns the submission handle and a join handle that resolves once every
/// sender has been dropped, yielding the finalized run and its counts. When
/// `live_output` is set, each result is echoed to the console as it lands,
/// in arrival order.
#[must_use]
pub fn spawn_collector(
    mut run: ValidationRun,
    live_output: bool,
) -> (ResultSender, JoinHandle<(ValidationRun, StatusCounts)>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<CheckResult>();

    let handle = tokio::spawn(async move {
        let mut counts = StatusCounts::default();
        while let Some(result) = rx.recv().await {
            counts.record(result.status);
            if live_output {
                println!("{}", result.console_line());
            }
            debug!(
                check = %result.name,
                suite = %result.suite,
                status = %result.status,
                duration_ms = result.duration_ms,
                "Recorded check result"
            );
            run.record(result);
        }
        (run, counts)
    });

    (tx, handle)
}
