//! Validation run lifecycle.
//!
//! A run walks `NotStarted → ResolvingTarget → RunningChecks → Aggregating →
//! Reporting → Done`. `Aborted` is terminal and reachable only while the
//! target is being resolved (unreachable cluster) or while checks run
//! (unrecoverable tooling failure).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregator::{overall_score, StatusCounts};
use crate::policy::{Verdict, VerdictPolicy, VerdictScope};
use crate::result::CheckResult;

/// Phases of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    NotStarted,
    ResolvingTarget,
    RunningChecks,
    Aggregating,
    Reporting,
    Done,
    Aborted,
}

impl RunPhase {
    /// The phase that follows on the happy path. Terminal phases stay put.
    #[must_use]
    pub fn next(&self) -> RunPhase {
        match self {
            Self::NotStarted => Self::ResolvingTarget,
            Self::ResolvingTarget => Self::RunningChecks,
            Self::RunningChecks => Self::Aggregating,
            Self::Aggregating => Self::Reporting,
            Self::Reporting | Self::Done => Self::Done,
            Self::Aborted => Self::Aborted,
        }
    }

    /// Whether an abort may originate from this phase.
    #[must_use]
    pub fn can_abort(&self) -> bool {
        matches!(self, Self::ResolvingTarget | Self::RunningChecks)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::ResolvingTarget => "resolving target",
            Self::RunningChecks => "running checks",
            Self::Aggregating => "aggregating results",
            Self::Reporting => "writing reports",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single validation run: metadata plus the ordered result set.
///
/// Created at program start, appended to by the collector, and treated as
/// read-only once the report emitter takes over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Kubeconfig context the run targeted, when one was given.
    pub cluster_context: Option<String>,
    pub namespace: String,
    /// Resolved base target, e.g. `https://grill.example.com` or
    /// `port-forward (6 tunnels)`.
    pub target: String,
    /// Flags that shaped the run (suites, parallelism, skips).
    pub config_flags: BTreeMap<String, String>,
    pub results: Vec<CheckResult>,
}

impl ValidationRun {
    #[must_use]
    pub fn new(cluster_context: Option<String>, namespace: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            cluster_context,
            namespace: namespace.into(),
            target: String::new(),
            config_flags: BTreeMap::new(),
            results: Vec::new(),
        }
    }

    /// Record a flag that shaped this run, for the report.
    pub fn set_flag(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.config_flags.insert(key.into(), value.to_string());
    }

    /// Append a result. Each result belongs to exactly one run.
    pub fn record(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    /// Aggregate the finished result set into a summary with a verdict.
    #[must_use]
    pub fn summarize(&self, policy: &VerdictPolicy, scope: VerdictScope) -> RunSummary {
        let counts = StatusCounts::from_results(&self.results);
        let score = overall_score(&self.results);
        RunSummary {
            counts,
            overall_score: score,
            verdict: policy.decide(scope, &counts, score),
            checks_duration_ms: self.results.iter().map(|r| r.duration_ms).sum(),
            finished_at: Utc::now(),
        }
    }
}

/// Aggregated summary of a finalized run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RunSummary {
    pub counts: StatusCounts,
    pub overall_score: u8,
    pub verdict: Verdict,
    /// Sum of individual check durations (checks may have overlapped).
    pub checks_duration_ms: u64,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Suite;

    #[test]
    fn test_phase_progression_reaches_done() {
        let mut phase = RunPhase::NotStarted;
        let mut seen = vec![phase];
        while !phase.is_terminal() {
            phase = phase.next();
            seen.push(phase);
            assert!(seen.len() <= 8, "phase walk did not terminate");
        }
        assert_eq!(
            seen,
            vec![
                RunPhase::NotStarted,
                RunPhase::ResolvingTarget,
                RunPhase::RunningChecks,
                RunPhase::Aggregating,
                RunPhase::Reporting,
                RunPhase::Done,
            ]
        );
    }

    #[test]
    fn test_abort_only_from_resolving_or_running() {
        assert!(RunPhase::ResolvingTarget.can_abort());
        assert!(RunPhase::RunningChecks.can_abort());
        assert!(!RunPhase::NotStarted.can_abort());
        assert!(!RunPhase::Aggregating.can_abort());
        assert!(!RunPhase::Reporting.can_abort());
        assert!(!RunPhase::Done.can_abort());
    }

    #[test]
    fn test_terminal_phases_stay_put() {
        assert_eq!(RunPhase::Done.next(), RunPhase::Done);
        assert_eq!(RunPhase::Aborted.next(), RunPhase::Aborted);
    }

    #[test]
    fn test_summarize_counts_and_verdict() {
        let mut run = ValidationRun::new(Some("homelab".into()), "grill-stats");
        for i in 0..12 {
            run.record(CheckResult::pass(
                format!("check-{i}"),
                Suite::Production,
                5,
                "ok",
            ));
        }

        let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);
        assert_eq!(summary.counts.passed, 12);
        assert_eq!(summary.counts.total(), 12);
        assert_eq!(summary.overall_score, 100);
        assert_eq!(summary.verdict, Verdict::Go);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let mut run = ValidationRun::new(None, "grill-stats");
        run.record(CheckResult::pass("a", Suite::Production, 5, "ok").with_score(90));
        run.record(CheckResult::fail("b", Suite::Security, 5, "nope"));
        run.record(CheckResult::skip("c", Suite::Performance, "skipped"));

        let first = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);
        let second = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);
        assert_eq!(first.overall_score, second.overall_score);
        assert_eq!(first.counts, second.counts);
        assert_eq!(first.verdict, second.verdict);
    }

    #[test]
    fn test_flags_land_in_report_metadata() {
        let mut run = ValidationRun::new(None, "grill-stats");
        run.set_flag("parallel", true);
        run.set_flag("suites", "production,security");
        assert_eq!(run.config_flags.get("parallel").unwrap(), "true");
    }
}
