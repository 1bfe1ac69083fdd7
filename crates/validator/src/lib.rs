//! Grill Stats platform validator.
//!
//! Resolves a reachable target for the platform under test, runs the four
//! validation suites against it, and feeds the results through the harness
//! engine for aggregation, verdict, and reports.

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod checks;
pub mod clients;
pub mod cluster;
pub mod config;
pub mod fixtures;
pub mod orchestrator;
pub mod tooling;
pub mod ui;

pub use checks::{checks_for, execute, Check, CheckContext};
pub use config::{ServiceSpec, SuiteSelection, ValidatorConfig, SERVICES};
pub use fixtures::FixtureTracker;
pub use orchestrator::run;
