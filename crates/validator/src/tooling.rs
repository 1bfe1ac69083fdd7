//! Required CLI tooling checks.
//!
//! The validator talks to the API server through kube directly; kubectl is
//! the one external CLI the run depends on (the port-forward fallback shells
//! out to it), so its absence aborts the run before any check executes.

use harness::Error;

/// Verify kubectl is on PATH.
///
/// # Errors
/// Returns [`Error::ToolingMissing`] if the binary cannot be found.
pub fn ensure_kubectl() -> Result<(), Error> {
    ensure_tool(
        "kubectl",
        "required for the port-forward fallback; see https://kubernetes.io/docs/tasks/tools/",
    )
}

fn ensure_tool(tool: &str, hint: &str) -> Result<(), Error> {
    match which::which(tool) {
        Ok(_) => Ok(()),
        Err(_) => Err(Error::ToolingMissing {
            tool: tool.to_string(),
            hint: hint.to_string(),
        }),
    }
}
