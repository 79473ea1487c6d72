use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::PipelineResult;

/// Result of one compile-check or test invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRun {
    /// Exit status was zero.
    pub success: bool,
    /// Raw exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// One-line digest of the output (error count, test tally).
    pub summary: Option<String>,
}

impl OracleRun {
    /// A successful run with no output.
    pub fn passed() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            summary: None,
        }
    }

    /// A failed run carrying `stderr` as its diagnostics.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(1),
            stdout: String::new(),
            stderr: stderr.into(),
            summary: None,
        }
    }

    /// Everything the process printed, stderr first.
    pub fn diagnostics(&self) -> String {
        match (self.stderr.trim().is_empty(), self.stdout.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stderr, self.stdout),
            (false, true) => self.stderr.clone(),
            (true, false) => self.stdout.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Pass/fail oracle over the whole workspace.
///
/// Both operations cover the entire workspace rather than the target file,
/// because a candidate may reference symbols shared across crates.
#[async_trait]
pub trait BuildOracle: Send + Sync {
    /// Compile-check the workspace.
    async fn check(&self) -> PipelineResult<OracleRun>;

    /// Run the workspace tests (integration tests excluded).
    async fn test(&self) -> PipelineResult<OracleRun>;
}
