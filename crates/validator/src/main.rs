//! Grill Stats Validation CLI.
//!
//! Runs the production, security, performance, and integration suites
//! against a Grill Stats deployment and renders a GO / CONDITIONAL-GO /
//! NO-GO verdict.

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use harness::Suite;
use tracing_subscriber::EnvFilter;

use grill_validator::config::{SuiteSelection, ValidatorConfig};
use grill_validator::{orchestrator, ui};

/// Grill Stats - platform validation harness.
#[derive(Parser)]
#[command(
    name = "grill-validate",
    version,
    about = "Validate a Grill Stats deployment",
    long_about = "Run validation suites against a deployed Grill Stats platform.\n\n\
                  Resolves the platform through its ingress (or per-service\n\
                  port-forward tunnels), executes the selected checks, and\n\
                  renders a GO / CONDITIONAL-GO / NO-GO verdict with JSON,\n\
                  HTML, and plain-text report artifacts.\n\n\
                  Exit code 0 on GO or CONDITIONAL-GO, 1 on NO-GO or abort."
)]
#[command(propagate_version = true)]
struct Cli {
    /// Namespace the platform is deployed in.
    #[arg(short = 'n', long, global = true, env = "NAMESPACE", default_value = "grill-stats")]
    namespace: String,

    /// Kubeconfig context to target.
    #[arg(long, global = true, env = "CLUSTER_CONTEXT")]
    context: Option<String>,

    /// Per-check timeout in seconds.
    #[arg(short = 't', long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Directory report artifacts are written under.
    #[arg(short = 'o', long, global = true, default_value = "validation-reports")]
    output: PathBuf,

    /// Run the non-integration suites concurrently.
    #[arg(long, global = true, env = "PARALLEL_EXECUTION")]
    parallel: bool,

    /// Threshold/verdict policy file (YAML).
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Skip writing report artifacts (GENERATE_REPORT=false does the same).
    #[arg(long, global = true)]
    no_report: bool,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every suite (integration last).
    All,
    /// Production readiness: pods, deployments, services, probes.
    Production,
    /// Security audit: network policies, identities, Vault transit.
    Security,
    /// Performance: latency, error rate, resource usage, metrics.
    Performance,
    /// Integration: device, auth, temperature, and encryption flows.
    Integration,
}

impl Commands {
    fn selection(&self) -> SuiteSelection {
        match self {
            Self::All => SuiteSelection::all(),
            Self::Production => SuiteSelection::single(Suite::Production),
            Self::Security => SuiteSelection::single(Suite::Security),
            Self::Performance => SuiteSelection::single(Suite::Performance),
            Self::Integration => SuiteSelection::single(Suite::Integration),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("info,grill_validator=debug,harness=debug")
    } else {
        EnvFilter::new("warn,grill_validator=info,harness=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    ui::print_banner();

    let config = ValidatorConfig {
        namespace: cli.namespace,
        cluster_context: cli.context,
        selection: cli.command.selection(),
        check_timeout: Duration::from_secs(cli.timeout),
        output_dir: cli.output,
        parallel: cli.parallel,
        generate_report: ValidatorConfig::report_enabled(cli.no_report),
        policy: ValidatorConfig::load_policy(cli.policy.as_ref())?,
    };

    let exit_code = orchestrator::run(config).await?;
    std::process::exit(exit_code);
}
