//! Grill Stats Validation Harness Library.
//!
//! Core engine shared by the `grill-validate` binary: check results and
//! scoring, the single-consumer result aggregator, threshold and verdict
//! policy, retry plumbing, and the report emitters.
//!
//! # Example
//!
//! ```ignore
//! use harness::{spawn_collector, ValidationRun, VerdictPolicy, VerdictScope};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let run = ValidationRun::new(None, "grill-stats");
//!     let (tx, collector) = spawn_collector(run, true);
//!     // ... checks send CheckResults through tx ...
//!     drop(tx);
//!     let (run, _counts) = collector.await?;
//!     let summary = run.summarize(&VerdictPolicy::default(), VerdictScope::Full);
//!     std::process::exit(summary.verdict.exit_code());
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod aggregator;
pub mod error;
pub mod policy;
pub mod report;
pub mod result;
pub mod retry;
pub mod run;

// Re-export commonly used types at the crate root
pub use aggregator::{overall_score, spawn_collector, ResultSender, StatusCounts};
pub use error::Error;
pub use policy::{
    RunPolicy, Threshold, ThresholdBreach, ThresholdPolicy, Verdict, VerdictPolicy, VerdictScope,
};
pub use report::{write_all as write_reports, ReportPaths};
pub use result::{CheckResult, CheckStatus, Suite};
pub use retry::{with_retry, RetryConfig};
pub use run::{RunPhase, RunSummary, ValidationRun};
