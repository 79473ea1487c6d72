//! Domain errors for the covboost pipeline.

use thiserror::Error;

/// Errors raised by pipeline stages.
///
/// Only [`PipelineError::ValidationFailure`] is absorbed locally (by the
/// validator's retry loop); every other variant aborts the running stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{tool} failed (exit code {exit_code:?}): {diagnostics}")]
    ToolInvocation {
        tool: String,
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("{tool} timed out after {timeout_secs}s")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    #[error("Model service authentication failed: {0}")]
    ServiceAuth(String),

    #[error("Model service call failed{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    ServiceCall {
        status: Option<u16>,
        message: String,
    },

    #[error("No eligible coverage data to select from")]
    NoCoverageData,

    #[error("Validation failed after {attempts} attempt(s): {reason}")]
    ValidationFailure { attempts: u32, reason: String },

    #[error("Missing stage state: {0} not found (was the previous stage run?)")]
    MissingState(String),

    #[error("Failed to back up {path}: {reason}")]
    BackupFailed { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Shorthand for a tool failure without an exit status.
    pub fn tool(tool: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            exit_code: None,
            diagnostics: diagnostics.into(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_call_message_includes_status() {
        let err = PipelineError::ServiceCall {
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Model service call failed (HTTP 503): unavailable"
        );
    }

    #[test]
    fn service_call_message_without_status() {
        let err = PipelineError::ServiceCall {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Model service call failed: connection refused");
    }
}
