//! End-to-end verdict scenarios through the collector pipeline.

use harness::{
    spawn_collector, CheckResult, CheckStatus, Suite, ValidationRun, VerdictPolicy, VerdictScope,
    Verdict,
};

fn new_run() -> ValidationRun {
    ValidationRun::new(Some("homelab".into()), "grill-stats")
}

async fn collect(results: Vec<CheckResult>) -> (ValidationRun, harness::StatusCounts) {
    let (tx, collector) = spawn_collector(new_run(), false);
    for result in results {
        tx.send(result).unwrap();
    }
    drop(tx);
    collector.await.unwrap()
}

#[tokio::test]
async fn twelve_clean_checks_are_a_go_with_exit_zero() {
    let results: Vec<CheckResult> = (0..12)
        .map(|i| CheckResult::pass(format!("check-{i}"), Suite::Production, 5, "ok"))
        .collect();

    let (run, counts) = collect(results).await;
    assert_eq!(counts.total(), 12);
    assert_eq!(counts.failed, 0);

    let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);
    assert_eq!(summary.verdict, Verdict::Go);
    assert_eq!(summary.verdict.exit_code(), 0);
}

#[tokio::test]
async fn one_failure_at_score_ninety_is_conditional_go_with_exit_zero() {
    let mut results: Vec<CheckResult> = (0..9)
        .map(|i| CheckResult::pass(format!("check-{i}"), Suite::Production, 5, "ok"))
        .collect();
    results.push(CheckResult::fail("vault-transit", Suite::Security, 80, "decrypt mismatch"));

    let (run, _) = collect(results).await;
    let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);

    assert_eq!(summary.overall_score, 90);
    assert_eq!(summary.counts.failed, 1);
    assert_eq!(summary.verdict, Verdict::ConditionalGo);
    assert_eq!(summary.verdict.exit_code(), 0);
}

#[tokio::test]
async fn three_failures_at_score_sixty_are_no_go_with_exit_one() {
    let mut results: Vec<CheckResult> = (0..6)
        .map(|i| CheckResult::pass(format!("check-{i}"), Suite::Production, 5, "ok"))
        .collect();
    for i in 0..3 {
        results.push(CheckResult::fail(format!("fail-{i}"), Suite::Security, 5, "bad"));
    }
    results.push(CheckResult::conditional("weak", Suite::Performance, 5, "meh").with_score(0));

    let (run, counts) = collect(results).await;
    assert_eq!(counts.failed, 3);

    let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);
    assert_eq!(summary.overall_score, 60);
    assert_eq!(summary.verdict, Verdict::NoGo);
    assert_eq!(summary.verdict.exit_code(), 1);
}

#[tokio::test]
async fn skips_do_not_dilute_the_verdict() {
    let results = vec![
        CheckResult::pass("a", Suite::Production, 1, "ok"),
        CheckResult::skip("b", Suite::Performance, "SKIP_PERFORMANCE set"),
        CheckResult::skip("c", Suite::Integration, "SKIP_INTEGRATION set"),
    ];

    let (run, counts) = collect(results).await;
    assert_eq!(counts.skipped, 2);

    let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);
    assert_eq!(summary.overall_score, 100);
    assert_eq!(summary.verdict, Verdict::Go);
}

#[tokio::test]
async fn report_artifacts_agree_with_the_summary() {
    let tmp = tempfile::tempdir().unwrap();

    let results = vec![
        CheckResult::pass("pods-running", Suite::Production, 84, "12/12 ready"),
        CheckResult::fail("error-rate", Suite::Performance, 120, "7.2% 5xx over 5m"),
    ];
    let (mut run, _) = collect(results).await;
    run.target = "https://grill.example.com".into();

    let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);
    let paths = harness::write_reports(tmp.path(), &run, &summary).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
    assert_eq!(json["schema"], "grill-stats.validation.v1");
    assert_eq!(json["summary"]["verdict"], "NO-GO");
    assert_eq!(json["run"]["target"], "https://grill.example.com");

    let text = std::fs::read_to_string(&paths.text).unwrap();
    assert!(text.contains("VERDICT: NO-GO"));
    let html = std::fs::read_to_string(&paths.html).unwrap();
    assert!(html.contains("error-rate"));
}

#[tokio::test]
async fn json_report_round_trips_the_run() {
    let results = vec![
        CheckResult::pass("pods-running", Suite::Production, 84, "ok"),
        CheckResult::conditional("cpu-usage", Suite::Performance, 30, "78.0% of CPU limits"),
        CheckResult::skip("vault-transit", Suite::Security, "VAULT_ADDR/VAULT_TOKEN not set"),
    ];
    let (run, _) = collect(results).await;

    let serialized = serde_json::to_string(&run).unwrap();
    let restored: ValidationRun = serde_json::from_str(&serialized).unwrap();

    assert_eq!(restored.run_id, run.run_id);
    assert_eq!(restored.namespace, run.namespace);
    assert_eq!(restored.results, run.results);
    assert_eq!(
        restored.results[2].status,
        CheckStatus::Skip
    );
}
