//! Condensed plain-text summary, suitable for CI logs and chat paste.

use std::fmt::Write as _;

use crate::result::Suite;
use crate::run::{RunSummary, ValidationRun};

/// Render the run as an uncolored text summary.
#[must_use]
pub fn render(run: &ValidationRun, summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "GRILL STATS VALIDATION SUMMARY");
    let _ = writeln!(out, "==============================");
    let _ = writeln!(out, "Run:       {}", run.run_id);
    let _ = writeln!(out, "Namespace: {}", run.namespace);
    let _ = writeln!(
        out,
        "Context:   {}",
        run.cluster_context.as_deref().unwrap_or("(default)")
    );
    let _ = writeln!(out, "Target:    {}", run.target);
    let _ = writeln!(out, "Started:   {}", run.started_at.to_rfc3339());
    let _ = writeln!(out, "Finished:  {}", summary.finished_at.to_rfc3339());
    let _ = writeln!(out);

    for suite in Suite::all() {
        let rows: Vec<_> = run.results.iter().filter(|r| r.suite == suite).collect();
        if rows.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}", suite.to_string().to_uppercase());
        for result in rows {
            let _ = writeln!(
                out,
                "  [{}] {} ({} ms) - {}",
                result.status, result.name, result.duration_ms, result.details
            );
        }
        let _ = writeln!(out);
    }

    let counts = &summary.counts;
    let _ = writeln!(
        out,
        "TOTALS: {} passed, {} failed, {} conditional, {} skipped ({} checks)",
        counts.passed,
        counts.failed,
        counts.conditional,
        counts.skipped,
        counts.total()
    );
    let _ = writeln!(out, "OVERALL SCORE: {}/100", summary.overall_score);
    let _ = writeln!(out, "VERDICT: {}", summary.verdict);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{VerdictPolicy, VerdictScope};
    use crate::result::CheckResult;

    #[test]
    fn test_summary_lists_checks_and_verdict() {
        let mut run = ValidationRun::new(Some("homelab".into()), "grill-stats");
        run.record(CheckResult::pass("pods-running", Suite::Production, 84, "12/12 ready"));
        run.record(CheckResult::fail("vault-transit", Suite::Security, 1203, "decrypt mismatch"));
        let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);

        let text = render(&run, &summary);

        assert!(text.contains("PRODUCTION"));
        assert!(text.contains("[PASS] pods-running (84 ms) - 12/12 ready"));
        assert!(text.contains("[FAIL] vault-transit (1203 ms) - decrypt mismatch"));
        assert!(text.contains("TOTALS: 1 passed, 1 failed, 0 conditional, 0 skipped (2 checks)"));
        assert!(text.contains("VERDICT: NO-GO"));
    }

    #[test]
    fn test_no_color_codes_in_output() {
        let mut run = ValidationRun::new(None, "grill-stats");
        run.record(CheckResult::pass("pods-running", Suite::Production, 1, "ok"));
        let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);

        let text = render(&run, &summary);
        assert!(!text.contains('\u{1b}'));
    }
}
