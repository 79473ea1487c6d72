//! Domain models.

pub mod config;
pub mod coverage;
pub mod generation;
pub mod metadata;

pub use config::{
    Config, CoverageConfig, LogFormat, LoggingConfig, ModelConfig, RetryStrategy,
    ValidationConfig, MAX_VALIDATION_ATTEMPTS,
};
pub use coverage::{
    CoverageAnalysis, CoverageCounter, CoverageExport, CoverageReport, CoverageSummary,
    FileCoverage, FileCoverageFilter, FileStats, OverallStats, SelectionResult,
};
pub use generation::{
    ContextFile, GenerationRequest, GenerationResponse, SplicePlacement, SpliceResult,
};
pub use metadata::PipelineMetadata;
