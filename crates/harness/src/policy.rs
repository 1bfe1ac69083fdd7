//! Threshold and verdict policy.
//!
//! The warn/fail boundaries and the CONDITIONAL-GO knobs were tuned
//! differently across the original validation scripts, so both live in one
//! policy file loaded once per run and are never mutated while checks
//! execute.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregator::StatusCounts;
use crate::error::Error;
use crate::result::Suite;

/// Warn/fail boundaries for one observed metric, where larger is worse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warn: f64,
    pub fail: f64,
}

impl Threshold {
    #[must_use]
    pub fn new(warn: f64, fail: f64) -> Self {
        Self { warn, fail }
    }

    /// Classify an observed value against the boundaries.
    #[must_use]
    pub fn breach(&self, observed: f64) -> ThresholdBreach {
        if observed >= self.fail {
            ThresholdBreach::Fail
        } else if observed >= self.warn {
            ThresholdBreach::Warn
        } else {
            ThresholdBreach::None
        }
    }

    /// Score an observed value: 100 below warn, 0 at or above fail, linear
    /// in between.
    #[must_use]
    pub fn score(&self, observed: f64) -> u8 {
        if observed < self.warn {
            return 100;
        }
        if observed >= self.fail || (self.fail - self.warn).abs() < f64::EPSILON {
            return 0;
        }
        let span = self.fail - self.warn;
        let over = observed - self.warn;
        let remaining = (1.0 - over / span) * 100.0;
        remaining.clamp(0.0, 100.0) as u8
    }
}

/// How far an observed value breached a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdBreach {
    None,
    Warn,
    Fail,
}

/// Static per-metric thresholds, loaded once and consulted by checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    #[serde(default)]
    metrics: BTreeMap<String, Threshold>,
}

impl ThresholdPolicy {
    /// Look up a metric's boundaries, falling back to the built-in default.
    #[must_use]
    pub fn get(&self, metric: &str) -> Threshold {
        self.metrics
            .get(metric)
            .copied()
            .unwrap_or_else(|| Self::builtin(metric))
    }

    /// Override a metric's boundaries.
    pub fn set(&mut self, metric: impl Into<String>, threshold: Threshold) {
        self.metrics.insert(metric.into(), threshold);
    }

    fn builtin(metric: &str) -> Threshold {
        match metric {
            "latency_p95_ms" => Threshold::new(500.0, 1000.0),
            "error_rate_percent" => Threshold::new(1.0, 5.0),
            "cpu_percent" => Threshold::new(70.0, 90.0),
            "memory_percent" => Threshold::new(75.0, 90.0),
            "pod_restart_count" => Threshold::new(1.0, 5.0),
            // Unknown metrics never pass silently: anything observed breaches.
            _ => Threshold::new(0.0, 0.0),
        }
    }
}

/// Release-readiness verdict for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "CONDITIONAL-GO")]
    ConditionalGo,
    #[serde(rename = "NO-GO")]
    NoGo,
}

impl Verdict {
    /// Process exit code: GO and CONDITIONAL-GO exit 0, NO-GO exits 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Go | Self::ConditionalGo => 0,
            Self::NoGo => 1,
        }
    }

    #[must_use]
    pub fn is_go(&self) -> bool {
        *self != Self::NoGo
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Go => write!(f, "GO"),
            Self::ConditionalGo => write!(f, "CONDITIONAL-GO"),
            Self::NoGo => write!(f, "NO-GO"),
        }
    }
}

/// Which conditional limits apply to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictScope {
    /// A single suite ran on its own.
    Suite(Suite),
    /// The full-suite orchestrator ran every selected suite.
    Full,
}

/// Configurable verdict knobs.
///
/// The original scripts disagreed on the exact numbers (85 vs 80 minimum
/// score, one vs two tolerated failures for security findings); these are
/// policy values, not constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictPolicy {
    /// Max FAIL results tolerated for CONDITIONAL-GO.
    pub max_fail_conditional: u32,
    /// Max FAIL results tolerated when only the security suite ran.
    pub security_max_fail: u32,
    /// Minimum overall score for CONDITIONAL-GO.
    pub min_score_conditional: u8,
    /// Minimum overall score for CONDITIONAL-GO on a full-suite run.
    pub aggregate_min_score: u8,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            max_fail_conditional: 1,
            security_max_fail: 2,
            min_score_conditional: 85,
            aggregate_min_score: 80,
        }
    }
}

impl VerdictPolicy {
    /// Apply the verdict rule to a finalized count set.
    ///
    /// GO requires zero failures. CONDITIONAL-GO tolerates a bounded number
    /// of failures provided the overall score clears the scope's minimum.
    /// Everything else is NO-GO.
    #[must_use]
    pub fn decide(&self, scope: VerdictScope, counts: &StatusCounts, overall_score: u8) -> Verdict {
        if counts.failed == 0 {
            return Verdict::Go;
        }

        let max_fail = match scope {
            VerdictScope::Suite(Suite::Security) => self.security_max_fail,
            _ => self.max_fail_conditional,
        };
        let min_score = match scope {
            VerdictScope::Full => self.aggregate_min_score,
            VerdictScope::Suite(_) => self.min_score_conditional,
        };

        if counts.failed <= max_fail && overall_score >= min_score {
            Verdict::ConditionalGo
        } else {
            Verdict::NoGo
        }
    }
}

/// Complete run policy: thresholds plus verdict knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPolicy {
    pub thresholds: ThresholdPolicy,
    pub verdict: VerdictPolicy,
}

impl RunPolicy {
    /// Load a policy from a YAML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}
