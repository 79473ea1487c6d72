//! Service layer: the pipeline stages and the logic they share.

pub mod coverage_analyzer;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod splice;
pub mod test_generator;
pub mod validator;

pub use coverage_analyzer::{CoverageAnalyzer, Measurement};
pub use pipeline::{
    AnalyzeOutcome, GenerateOutcome, PipelineServices, RegeneratingSource, ReportOutcome,
    RunOutcome, StageContext, StoredCandidate, ValidateOutcome,
};
pub use progress::{ProgressEvent, ProgressSink, RecordingProgress, SilentProgress};
pub use report::{CoverageStatsDocument, FileDelta};
pub use splice::splice;
pub use test_generator::{GeneratedCandidate, TestGenerator};
pub use validator::{
    AttemptOutcome, AttemptReport, AttemptState, CandidateSource, FixedCandidate,
    TestValidator, ValidationDriver, ValidationReport, Verdict,
};
