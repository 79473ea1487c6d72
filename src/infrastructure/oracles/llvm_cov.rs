//! Coverage oracle backed by `cargo llvm-cov --json` (or any command that
//! produces the same JSON export).

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::{CoverageConfig, CoverageReport};
use crate::domain::ports::CoverageOracle;

use super::process::{self, CommandSpec};

/// Runs the configured coverage command and parses its JSON export.
///
/// By default the report is read from stdout. With `report_path` set, stdout
/// is ignored and the report is read from that file after the command exits
/// successfully (e.g. a `make coverage-summary` target writing `codecov.json`).
pub struct LlvmCovOracle {
    command: CommandSpec,
    report_path: Option<PathBuf>,
}

impl LlvmCovOracle {
    /// Create an oracle running `command`.
    pub fn new(command: CommandSpec, report_path: Option<PathBuf>) -> Self {
        Self {
            command,
            report_path,
        }
    }

    /// Build from configuration, running in `workspace_dir`.
    pub fn from_config(config: &CoverageConfig, workspace_dir: impl Into<PathBuf>) -> Self {
        let workspace_dir = workspace_dir.into();
        let report_path = config.report_path.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                workspace_dir.join(path)
            }
        });
        Self::new(
            CommandSpec::new(
                config.program.clone(),
                config.args.clone(),
                workspace_dir,
                config.timeout_secs,
            ),
            report_path,
        )
    }

    fn parse(&self, json: &str) -> PipelineResult<CoverageReport> {
        serde_json::from_str(json).map_err(|e| {
            PipelineError::tool(
                self.command.tool_name(),
                format!("coverage output is not a valid coverage report: {e}"),
            )
        })
    }
}

#[async_trait]
impl CoverageOracle for LlvmCovOracle {
    #[instrument(skip(self), fields(command = %self.command.display()))]
    async fn measure(&self) -> PipelineResult<CoverageReport> {
        process::ensure_dir(&self.command.cwd, &self.command.tool_name())?;
        let output = process::run(&self.command).await?;

        if !output.success {
            return Err(PipelineError::ToolInvocation {
                tool: self.command.tool_name(),
                exit_code: output.exit_code,
                diagnostics: output.stderr,
            });
        }

        let report = match &self.report_path {
            Some(path) => {
                let json = tokio::fs::read_to_string(path).await.map_err(|e| {
                    PipelineError::tool(
                        self.command.tool_name(),
                        format!("failed to read coverage report {}: {e}", path.display()),
                    )
                })?;
                self.parse(&json)?
            }
            None => self.parse(&output.stdout)?,
        };

        info!(files = report.files().len(), "Coverage measurement complete");
        Ok(report)
    }
}
