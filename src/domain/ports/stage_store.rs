//! Stage context: where stages leave results for their successors.

use crate::domain::errors::PipelineResult;

/// The fixed set of intermediate results exchanged between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageArtifact {
    /// Selected file and its statistics.
    CoverageAnalysis,
    /// Project-wide file count and average coverage.
    OverallCoverage,
    /// Cross-stage metadata record.
    GenerationMetadata,
    /// Candidate file content with generated tests.
    Candidate,
    /// Rendered before/after report.
    Report,
    /// Detailed before/after/improvement statistics.
    Stats,
}

impl StageArtifact {
    /// Well-known file name of the artifact.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::CoverageAnalysis => "coverage_analysis.json",
            Self::OverallCoverage => "overall_coverage.json",
            Self::GenerationMetadata => "test_generation_metadata.json",
            Self::Candidate => "updated_file.rs",
            Self::Report => "coverage_report.md",
            Self::Stats => "coverage_stats.json",
        }
    }
}

impl std::fmt::Display for StageArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Persistence for stage artifacts.
///
/// Implementations must never expose a half-written artifact: a reader sees
/// either the previous complete contents or the new complete contents.
pub trait StageStore: Send + Sync {
    /// Replace the artifact's contents.
    fn write(&self, artifact: StageArtifact, contents: &str) -> PipelineResult<()>;

    /// Read the artifact, `None` if it was never written.
    fn read(&self, artifact: StageArtifact) -> PipelineResult<Option<String>>;

    /// Human-readable location of the artifact (a path for file stores).
    fn location(&self, artifact: StageArtifact) -> String;
}
