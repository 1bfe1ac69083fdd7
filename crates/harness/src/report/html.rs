//! Human-readable HTML report.

use serde::Serialize;

use crate::error::Error;
use crate::result::{CheckResult, CheckStatus, Suite};
use crate::run::{RunSummary, ValidationRun};

#[derive(Serialize)]
struct HtmlContext {
    verdict: String,
    verdict_class: &'static str,
    overall_score: u8,
    run_id: String,
    namespace: String,
    cluster_context: String,
    target: String,
    started_at: String,
    finished_at: String,
    duration_ms: u64,
    passed: u32,
    failed: u32,
    conditional: u32,
    skipped: u32,
    total: u32,
    suites: Vec<SuiteSection>,
}

#[derive(Serialize)]
struct SuiteSection {
    name: String,
    rows: Vec<Row>,
}

#[derive(Serialize)]
struct Row {
    name: String,
    status: String,
    status_class: &'static str,
    duration_ms: u64,
    score: u8,
    details: String,
}

fn status_class(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "pass",
        CheckStatus::Fail => "fail",
        CheckStatus::Conditional => "conditional",
        CheckStatus::Skip => "skip",
    }
}

fn row(result: &CheckResult) -> Row {
    Row {
        name: result.name.clone(),
        status: result.status.to_string(),
        status_class: status_class(result.status),
        duration_ms: result.duration_ms,
        score: result.score,
        details: result.details.clone(),
    }
}

fn build_context(run: &ValidationRun, summary: &RunSummary) -> HtmlContext {
    let suites = Suite::all()
        .iter()
        .filter_map(|suite| {
            let rows: Vec<Row> = run
                .results
                .iter()
                .filter(|r| r.suite == *suite)
                .map(row)
                .collect();
            if rows.is_empty() {
                None
            } else {
                Some(SuiteSection {
                    name: suite.to_string(),
                    rows,
                })
            }
        })
        .collect();

    HtmlContext {
        verdict: summary.verdict.to_string(),
        verdict_class: match summary.verdict {
            crate::policy::Verdict::Go => "go",
            crate::policy::Verdict::ConditionalGo => "conditional-go",
            crate::policy::Verdict::NoGo => "no-go",
        },
        overall_score: summary.overall_score,
        run_id: run.run_id.to_string(),
        namespace: run.namespace.clone(),
        cluster_context: run
            .cluster_context
            .clone()
            .unwrap_or_else(|| "(default)".to_string()),
        target: run.target.clone(),
        started_at: run.started_at.to_rfc3339(),
        finished_at: summary.finished_at.to_rfc3339(),
        duration_ms: summary.checks_duration_ms,
        passed: summary.counts.passed,
        failed: summary.counts.failed,
        conditional: summary.counts.conditional,
        skipped: summary.counts.skipped,
        total: summary.counts.total(),
        suites,
    }
}

/// Render the run as a standalone HTML page.
///
/// # Errors
/// Returns an error if the embedded template fails to register or render.
pub fn render(run: &ValidationRun, summary: &RunSummary) -> Result<String, Error> {
    let mut handlebars = handlebars::Handlebars::new();
    handlebars.register_template_string("report", REPORT_TEMPLATE)?;
    let rendered = handlebars.render("report", &build_context(run, summary))?;
    Ok(rendered)
}

const REPORT_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Grill Stats Validation Report</title>
<style>
  body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2rem auto; max-width: 960px; color: #1f2328; }
  h1 { margin-bottom: 0.25rem; }
  h2 { margin-top: 2rem; border-bottom: 1px solid #d0d7de; padding-bottom: 0.25rem; }
  .meta { color: #57606a; font-size: 0.9rem; }
  .verdict { display: inline-block; padding: 0.4rem 1rem; border-radius: 6px; font-weight: 700; font-size: 1.2rem; margin: 1rem 0; }
  .verdict.go { background: #dafbe1; color: #116329; }
  .verdict.conditional-go { background: #fff8c5; color: #7d4e00; }
  .verdict.no-go { background: #ffebe9; color: #a40e26; }
  table { border-collapse: collapse; width: 100%; }
  th, td { text-align: left; padding: 0.4rem 0.6rem; border-bottom: 1px solid #d8dee4; font-size: 0.9rem; }
  th { background: #f6f8fa; }
  td.status { font-weight: 600; }
  td.status.pass { color: #116329; }
  td.status.fail { color: #a40e26; }
  td.status.conditional { color: #7d4e00; }
  td.status.skip { color: #57606a; }
  .totals { margin: 1rem 0; font-size: 0.95rem; }
</style>
</head>
<body>
<h1>Grill Stats Validation Report</h1>
<p class="meta">
  Run {{run_id}}<br>
  Namespace <strong>{{namespace}}</strong>, context <strong>{{cluster_context}}</strong><br>
  Target {{target}}<br>
  Started {{started_at}} &middot; finished {{finished_at}} &middot; checks took {{duration_ms}} ms
</p>
<div class="verdict {{verdict_class}}">{{verdict}} &middot; score {{overall_score}}/100</div>
<p class="totals">
  {{passed}} passed &middot; {{failed}} failed &middot; {{conditional}} conditional &middot; {{skipped}} skipped ({{total}} checks)
</p>
{{#each suites}}
<h2>{{name}}</h2>
<table>
  <thead>
    <tr><th>Check</th><th>Status</th><th>Duration</th><th>Score</th><th>Details</th></tr>
  </thead>
  <tbody>
    {{#each rows}}
    <tr>
      <td>{{name}}</td>
      <td class="status {{status_class}}">{{status}}</td>
      <td>{{duration_ms}} ms</td>
      <td>{{score}}</td>
      <td>{{details}}</td>
    </tr>
    {{/each}}
  </tbody>
</table>
{{/each}}
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{VerdictPolicy, VerdictScope};

    #[test]
    fn test_render_groups_by_suite() {
        let mut run = ValidationRun::new(None, "grill-stats");
        run.record(CheckResult::pass("pods-running", Suite::Production, 10, "ok"));
        run.record(CheckResult::fail("tls-ingress", Suite::Security, 20, "no cert"));
        let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);

        let html = render(&run, &summary).unwrap();

        assert!(html.contains("<h2>production</h2>"));
        assert!(html.contains("<h2>security</h2>"));
        // No performance checks ran, so no empty section for it.
        assert!(!html.contains("<h2>performance</h2>"));
        assert!(html.contains("pods-running"));
        assert!(html.contains("class=\"status fail\""));
    }

    #[test]
    fn test_verdict_banner_reflects_summary() {
        let mut run = ValidationRun::new(None, "grill-stats");
        for i in 0..3 {
            run.record(CheckResult::fail(
                format!("check-{i}"),
                Suite::Production,
                5,
                "broken",
            ));
        }
        let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);

        let html = render(&run, &summary).unwrap();
        assert!(html.contains("class=\"verdict no-go\""));
        assert!(html.contains("NO-GO"));
    }

    #[test]
    fn test_details_are_html_escaped() {
        let mut run = ValidationRun::new(None, "grill-stats");
        run.record(CheckResult::fail(
            "service-accounts",
            Suite::Security,
            5,
            "<script>alert(1)</script>",
        ));
        let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);

        let html = render(&run, &summary).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
