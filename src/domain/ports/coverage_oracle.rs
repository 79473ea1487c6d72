use async_trait::async_trait;

use crate::domain::errors::PipelineResult;
use crate::domain::models::CoverageReport;

/// Opaque producer of coverage reports.
#[async_trait]
pub trait CoverageOracle: Send + Sync {
    /// Run the coverage measurement over the whole workspace.
    ///
    /// # Errors
    /// * `PipelineError::ToolInvocation` if the process exits non-zero or its
    ///   output cannot be parsed as a coverage report
    /// * `PipelineError::ToolTimeout` if the measurement exceeds its time limit
    async fn measure(&self) -> PipelineResult<CoverageReport>;
}
