//! Machine-readable report for CI consumers.

use serde::Serialize;

use crate::error::Error;
use crate::run::{RunSummary, ValidationRun};

/// Schema identifier consumers can pin their parsers to.
pub const REPORT_SCHEMA: &str = "grill-stats.validation.v1";

#[derive(Serialize)]
struct JsonReport<'a> {
    schema: &'static str,
    run: &'a ValidationRun,
    summary: &'a RunSummary,
}

/// Render the full run as pretty-printed JSON.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn render(run: &ValidationRun, summary: &RunSummary) -> Result<String, Error> {
    let report = JsonReport {
        schema: REPORT_SCHEMA,
        run,
        summary,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{VerdictPolicy, VerdictScope};
    use crate::result::{CheckResult, Suite};

    #[test]
    fn test_report_carries_schema_and_verdict() {
        let mut run = ValidationRun::new(None, "grill-stats");
        run.record(CheckResult::pass("pods-running", Suite::Production, 10, "ok"));
        let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);

        let rendered = render(&run, &summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["schema"], REPORT_SCHEMA);
        assert_eq!(value["summary"]["verdict"], "GO");
        assert_eq!(value["summary"]["overall_score"], 100);
        assert_eq!(value["run"]["results"][0]["status"], "PASS");
    }

    #[test]
    fn test_statuses_serialize_screaming_snake() {
        let mut run = ValidationRun::new(None, "grill-stats");
        run.record(CheckResult::conditional(
            "error-rate",
            Suite::Performance,
            44,
            "0.7% over 5m",
        ));
        let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);

        let rendered = render(&run, &summary).unwrap();
        assert!(rendered.contains("\"CONDITIONAL\""));
    }
}
