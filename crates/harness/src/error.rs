//! Error types for validation runs.
//!
//! Only two categories abort a run: an unreachable target and missing
//! required tooling. Everything else a check observes is demoted to a
//! recorded FAIL and surfaced through the report.

use thiserror::Error;

/// Errors that abort a validation run.
#[derive(Debug, Error)]
pub enum Error {
    /// No ingress host and no forwardable service was found.
    #[error("target unreachable: {0}")]
    TargetUnreachable(String),

    /// A required CLI is not on PATH.
    #[error("required tool '{tool}' not found: {hint}")]
    ToolingMissing { tool: String, hint: String },

    /// Report artifact I/O failed.
    #[error("report I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Policy file could not be parsed.
    #[error("policy file error: {0}")]
    Policy(#[from] serde_yaml::Error),

    /// HTML template registration failed.
    #[error("template error: {0}")]
    Template(Box<handlebars::TemplateError>),

    /// HTML template rendering failed.
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(Box::new(err))
    }
}

impl Error {
    /// Whether the error must stop the run before any checks execute.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::TargetUnreachable(_) | Self::ToolingMissing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_classification() {
        assert!(Error::TargetUnreachable("no ingress".into()).is_abort());
        assert!(Error::ToolingMissing {
            tool: "kubectl".into(),
            hint: "install kubectl".into()
        }
        .is_abort());
        assert!(!Error::Io(std::io::Error::other("disk")).is_abort());
    }

    #[test]
    fn test_display_names_the_tool() {
        let err = Error::ToolingMissing {
            tool: "kubectl".into(),
            hint: "https://kubernetes.io/docs/tasks/tools/".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("kubectl"));
        assert!(msg.contains("not found"));
    }
}
