//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands, GenerateArgs, RetryArgs, RunArgs, ValidateArgs};

use crate::domain::errors::PipelineError;

/// Print `err` and exit with status 1.
///
/// In JSON mode the error is printed to stdout as `{"error": ..., "kind": ...}`
/// so callers parsing stdout always get a document.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let kind = err
        .downcast_ref::<PipelineError>()
        .map_or("error", error_kind);

    if json_mode {
        let body = serde_json::json!({
            "error": format!("{err:#}"),
            "kind": kind,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("Error:").red().bold());
    }
    std::process::exit(1);
}

/// Stable machine-readable name of a pipeline error.
pub const fn error_kind(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::ToolInvocation { .. } => "tool_invocation",
        PipelineError::ToolTimeout { .. } => "tool_timeout",
        PipelineError::ServiceAuth(_) => "service_auth",
        PipelineError::ServiceCall { .. } => "service_call",
        PipelineError::NoCoverageData => "no_coverage_data",
        PipelineError::ValidationFailure { .. } => "validation_failure",
        PipelineError::MissingState(_) => "missing_state",
        PipelineError::BackupFailed { .. } => "backup_failed",
        PipelineError::Io(_) => "io",
        PipelineError::Serialization(_) => "serialization",
        PipelineError::Config(_) => "config",
    }
}
