//! Check result data model.
//!
//! A [`CheckResult`] is created once per check invocation and is immutable
//! afterwards; the aggregator owns the collection for the lifetime of the
//! run.

use std::fmt;
use std::time::Duration;

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Outcome classification for a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Conditional,
    Skip,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Conditional => write!(f, "CONDITIONAL"),
            Self::Skip => write!(f, "SKIP"),
        }
    }
}

/// The check group a result belongs to.
///
/// Mirrors the validation suites the platform ships: production readiness,
/// security audit, performance test, and the integration tests that must run
/// against a quiet cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    Production,
    Security,
    Performance,
    Integration,
}

impl Suite {
    /// All suites in execution order (integration last).
    #[must_use]
    pub fn all() -> [Suite; 4] {
        [
            Suite::Production,
            Suite::Security,
            Suite::Performance,
            Suite::Integration,
        ]
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default score stamped on a passing check.
pub const SCORE_PASS: u8 = 100;
/// Default score stamped on a conditional check.
pub const SCORE_CONDITIONAL: u8 = 70;

/// A single named validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check identifier, e.g. `health-temperature-service`.
    pub name: String,
    /// Suite the check belongs to.
    pub suite: Suite,
    /// Outcome classification.
    pub status: CheckStatus,
    /// Wall time the check took, in milliseconds.
    pub duration_ms: u64,
    /// 0-100; contributes to the overall score unless the check was skipped.
    pub score: u8,
    /// Free-text explanation of the outcome.
    pub details: String,
}

impl CheckResult {
    /// A passing result (score 100).
    #[must_use]
    pub fn pass(
        name: impl Into<String>,
        suite: Suite,
        duration_ms: u64,
        details: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            suite,
            status: CheckStatus::Pass,
            duration_ms,
            score: SCORE_PASS,
            details: details.into(),
        }
    }

    /// A conditional result (default score 70, override with [`Self::with_score`]).
    #[must_use]
    pub fn conditional(
        name: impl Into<String>,
        suite: Suite,
        duration_ms: u64,
        details: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            suite,
            status: CheckStatus::Conditional,
            duration_ms,
            score: SCORE_CONDITIONAL,
            details: details.into(),
        }
    }

    /// A failing result (score 0).
    #[must_use]
    pub fn fail(
        name: impl Into<String>,
        suite: Suite,
        duration_ms: u64,
        details: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            suite,
            status: CheckStatus::Fail,
            duration_ms,
            score: 0,
            details: details.into(),
        }
    }

    /// A skipped check. Skips never contribute to the overall score.
    #[must_use]
    pub fn skip(name: impl Into<String>, suite: Suite, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suite,
            status: CheckStatus::Skip,
            duration_ms: 0,
            score: 0,
            details: details.into(),
        }
    }

    /// A check that exceeded its timeout after exhausting retries.
    ///
    /// Always recorded as FAIL with score 0 so a timed-out check can never
    /// go missing from the run.
    #[must_use]
    pub fn fail_timeout(name: impl Into<String>, suite: Suite, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        Self::fail(
            name,
            suite,
            millis,
            format!("timed out after {millis} ms"),
        )
    }

    /// Override the score, clamped to 100.
    #[must_use]
    pub fn with_score(mut self, score: u8) -> Self {
        self.score = score.min(100);
        self
    }

    /// Whether this result contributes to the overall score.
    #[must_use]
    pub fn counts_toward_score(&self) -> bool {
        self.status != CheckStatus::Skip
    }

    /// Colored one-line rendering for the live console stream.
    #[must_use]
    pub fn console_line(&self) -> String {
        let icon = match self.status {
            CheckStatus::Pass => "✓".green().bold(),
            CheckStatus::Fail => "✗".red().bold(),
            CheckStatus::Conditional => "⚠".yellow().bold(),
            CheckStatus::Skip => "-".bright_black(),
        };

        if self.status == CheckStatus::Skip {
            format!(
                "  {icon} {}/{} - {}",
                self.suite.to_string().bright_black(),
                self.name.bright_black(),
                self.details.bright_black()
            )
        } else {
            format!(
                "  {icon} {}/{} ({} ms) - {}",
                self.suite.to_string().bright_black(),
                self.name.bold(),
                self.duration_ms,
                self.details
            )
        }
    }
}
