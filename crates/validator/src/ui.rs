//! UI helpers for the validator CLI.
//!
//! Provides consistent formatting for console output during a run.

use colored::Colorize;
use harness::{ReportPaths, StatusCounts, Suite, Verdict};

/// Print the Grill Stats banner.
pub fn print_banner() {
    println!();
    println!(
        "{}",
        r"
   ____      _ _ _   ____  _        _
  / ___|_ __(_) | | / ___|| |_ __ _| |_ ___
 | |  _| '__| | | | \___ \| __/ _` | __/ __|
 | |_| | |  | | | |  ___) | || (_| | |_\__ \
  \____|_|  |_|_|_| |____/ \__\__,_|\__|___/
"
        .cyan()
    );
    println!("  {}", "Platform Validation Harness".bright_black());
    println!();
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(70).bright_black());
    println!();
}

/// Print a step indicator with message.
pub fn print_step(message: &str) {
    println!("{} {}", "▶".cyan(), message.bold());
}

/// Print a suite header with its check count.
pub fn print_suite_header(suite: Suite, total: usize) {
    println!();
    println!(
        "{} {} {}",
        "▶".cyan(),
        format!("{suite} suite").bold(),
        format!("({total} checks)").bright_black()
    );
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message.red());
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print the final count summary.
pub fn print_summary(counts: &StatusCounts, overall_score: u8) {
    println!();
    println!(
        "  {}  {}",
        "passed:".bright_black(),
        counts.passed.to_string().green().bold()
    );
    println!(
        "  {}  {}",
        "failed:".bright_black(),
        counts.failed.to_string().red().bold()
    );
    println!(
        "  {}  {}",
        "conditional:".bright_black(),
        counts.conditional.to_string().yellow().bold()
    );
    println!(
        "  {}  {}",
        "skipped:".bright_black(),
        counts.skipped.to_string().bright_black()
    );
    println!(
        "  {}  {}",
        "score:".bright_black(),
        format!("{overall_score}/100").bold()
    );
}

/// Print the verdict banner.
pub fn print_verdict(verdict: Verdict) {
    let text = format!("   {verdict}   ");
    let banner = match verdict {
        Verdict::Go => text.black().on_green().bold(),
        Verdict::ConditionalGo => text.black().on_yellow().bold(),
        Verdict::NoGo => text.white().on_red().bold(),
    };
    println!();
    println!("  {banner}");
    println!();
}

/// Print where the report artifacts landed.
pub fn print_report_paths(paths: &ReportPaths) {
    print_info(&format!("Reports written to {}", paths.dir.display()));
    println!("    {} {}", "•".bright_black(), paths.json.display());
    println!("    {} {}", "•".bright_black(), paths.html.display());
    println!("    {} {}", "•".bright_black(), paths.text.display());
}
