//! Stage orchestration.
//!
//! Each stage reads its predecessors' artifacts from a [`StageStore`], does its
//! work through the service it wraps, and writes its own artifacts. Stages can
//! be run one at a time (separate processes) or chained by [`run_all`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::{
    CoverageAnalysis, FileStats, OverallStats, PipelineMetadata, SelectionResult,
};
use crate::domain::ports::{StageArtifact, StageStore};
use crate::services::coverage_analyzer::CoverageAnalyzer;
use crate::services::progress::ProgressSink;
use crate::services::report::{render, CoverageStatsDocument, ReportInput};
use crate::services::test_generator::{GeneratedCandidate, TestGenerator};
use crate::services::validator::{AttemptReport, CandidateSource, ValidationDriver};

/// Number of files listed by the analyze stage.
pub const LEAST_COVERED_LISTING: usize = 10;

/// Shared state of a pipeline run: the artifact store and the workspace root.
#[derive(Clone)]
pub struct StageContext {
    store: Arc<dyn StageStore>,
    workspace_dir: PathBuf,
}

impl StageContext {
    /// Create a context.
    pub fn new(store: Arc<dyn StageStore>, workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            workspace_dir: workspace_dir.into(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &dyn StageStore {
        self.store.as_ref()
    }

    /// Resolve a path reported by an oracle against the workspace root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_dir.join(path)
        }
    }

    /// Serialize `value` as pretty JSON into `artifact`.
    pub fn save_json<T: Serialize>(&self, artifact: StageArtifact, value: &T) -> PipelineResult<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.store.write(artifact, &json)
    }

    /// Load a required JSON artifact.
    pub fn load_json<T: DeserializeOwned>(&self, artifact: StageArtifact) -> PipelineResult<T> {
        let text = self.load_text(artifact)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load a required text artifact.
    pub fn load_text(&self, artifact: StageArtifact) -> PipelineResult<String> {
        self.store
            .read(artifact)?
            .ok_or_else(|| PipelineError::MissingState(self.store.location(artifact)))
    }
}

/// Result of the analyze stage.
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    /// Selected file plus project aggregate.
    pub selection: SelectionResult,
    /// Least-covered files, lowest first.
    pub least_covered: Vec<FileStats>,
}

/// Measure coverage, select the worst file, persist the selection.
pub async fn analyze(
    ctx: &StageContext,
    analyzer: &CoverageAnalyzer,
    progress: &dyn ProgressSink,
) -> PipelineResult<AnalyzeOutcome> {
    progress.stage("Analyzing Code Coverage");
    progress.step("Running coverage analysis...");

    let measurement = analyzer.measure().await?;
    let selection = measurement.select()?;
    let least_covered = measurement.least_covered(LEAST_COVERED_LISTING);

    ctx.save_json(StageArtifact::CoverageAnalysis, &CoverageAnalysis::from(&selection))?;
    ctx.save_json(StageArtifact::OverallCoverage, &selection.overall)?;

    progress.success(&format!(
        "Selected {} ({:.2}% coverage)",
        selection.worst.path, selection.worst.coverage
    ));
    progress.step(&format!(
        "Saved analysis to {}",
        ctx.store().location(StageArtifact::CoverageAnalysis)
    ));
    info!(
        file = %selection.worst.path,
        coverage = selection.worst.coverage,
        total_files = selection.overall.total_files,
        "Coverage analysis complete"
    );

    Ok(AnalyzeOutcome {
        selection,
        least_covered,
    })
}

/// Result of the generate stage.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    /// Freshly written metadata.
    pub metadata: PipelineMetadata,
    /// The candidate that was persisted.
    pub candidate: GeneratedCandidate,
}

fn persist_candidate(
    ctx: &StageContext,
    analysis: &CoverageAnalysis,
    candidate: &GeneratedCandidate,
) -> PipelineResult<PipelineMetadata> {
    ctx.store()
        .write(StageArtifact::Candidate, &candidate.splice.content)?;

    let metadata = PipelineMetadata::new(
        analysis.file.clone(),
        ctx.store().location(StageArtifact::Candidate),
        analysis.coverage,
        Some(candidate.model.clone()),
    );
    ctx.save_json(StageArtifact::GenerationMetadata, &metadata)?;
    Ok(metadata)
}

/// Generate a candidate for the selected file and persist it with fresh metadata.
pub async fn generate(
    ctx: &StageContext,
    generator: &TestGenerator,
    progress: &dyn ProgressSink,
) -> PipelineResult<GenerateOutcome> {
    progress.stage("Generating Unit Tests");
    let analysis: CoverageAnalysis = ctx.load_json(StageArtifact::CoverageAnalysis)?;

    progress.step(&format!(
        "Target file: {} ({:.2}% coverage)",
        analysis.file, analysis.coverage
    ));
    progress.step(&format!("Calling model {}...", generator.model_name()));

    let target = ctx.resolve(&analysis.file);
    let candidate = generator
        .generate(&target.to_string_lossy(), &analysis.stats)
        .await?;
    let metadata = persist_candidate(ctx, &analysis, &candidate)?;

    progress.success(&format!(
        "Generated {} lines of test code",
        candidate.tests.lines().count()
    ));
    progress.step(&format!("Candidate saved to {}", metadata.generated_tests_path));

    Ok(GenerateOutcome {
        metadata,
        candidate,
    })
}

/// Candidate source backed by the persisted candidate, regenerating through
/// the model on retries.
pub struct RegeneratingSource<'a> {
    ctx: &'a StageContext,
    generator: &'a TestGenerator,
    progress: &'a dyn ProgressSink,
    analysis: CoverageAnalysis,
}

impl<'a> RegeneratingSource<'a> {
    /// Create a source for the analysis persisted in `ctx`.
    pub fn new(
        ctx: &'a StageContext,
        generator: &'a TestGenerator,
        analysis: CoverageAnalysis,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            ctx,
            generator,
            progress,
            analysis,
        }
    }
}

#[async_trait]
impl CandidateSource for RegeneratingSource<'_> {
    async fn initial(&self) -> PipelineResult<String> {
        self.ctx.load_text(StageArtifact::Candidate)
    }

    async fn regenerate(&self, attempt: u32) -> PipelineResult<String> {
        let target = self.ctx.resolve(&self.analysis.file);
        let candidate = self
            .generator
            .generate(&target.to_string_lossy(), &self.analysis.stats)
            .await?;
        persist_candidate(self.ctx, &self.analysis, &candidate)?;

        self.progress.step(&format!(
            "Regenerated candidate for attempt {attempt} ({} lines)",
            candidate.tests.lines().count()
        ));
        Ok(candidate.splice.content)
    }
}

/// Source that only ever yields the persisted candidate.
pub struct StoredCandidate<'a> {
    ctx: &'a StageContext,
}

impl<'a> StoredCandidate<'a> {
    /// Create a source reading from `ctx`.
    pub const fn new(ctx: &'a StageContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CandidateSource for StoredCandidate<'_> {
    async fn initial(&self) -> PipelineResult<String> {
        self.ctx.load_text(StageArtifact::Candidate)
    }

    async fn regenerate(&self, _attempt: u32) -> PipelineResult<String> {
        self.ctx.load_text(StageArtifact::Candidate)
    }
}

/// Result of the validate stage.
#[derive(Debug, Clone)]
pub struct ValidateOutcome {
    /// Metadata with the validation verdict recorded.
    pub metadata: PipelineMetadata,
    /// Per-attempt records.
    pub attempts: Vec<AttemptReport>,
}

/// Validate the persisted candidate against the working tree.
///
/// The verdict is written to the metadata whatever the outcome. Exhausting the
/// attempts returns [`PipelineError::ValidationFailure`].
pub async fn validate(
    ctx: &StageContext,
    driver: &ValidationDriver,
    source: &dyn CandidateSource,
    progress: &dyn ProgressSink,
) -> PipelineResult<ValidateOutcome> {
    progress.stage("Validating Generated Tests");
    let mut metadata: PipelineMetadata = ctx.load_json(StageArtifact::GenerationMetadata)?;
    let target = ctx.resolve(&metadata.original_file);

    let report = driver.run(&target, source, progress).await;

    // Regeneration may have rewritten the metadata with a new model.
    if let Ok(latest) = ctx.load_json::<PipelineMetadata>(StageArtifact::GenerationMetadata) {
        metadata = latest;
    }
    metadata.record_validation(report.success(), report.attempts_made());
    ctx.save_json(StageArtifact::GenerationMetadata, &metadata)?;

    let attempts = report.attempts.clone();
    match report.into_result() {
        Ok(_) => {
            progress.success(&format!(
                "Tests validated successfully after {} attempt(s)",
                metadata.validation_attempts.unwrap_or_default()
            ));
            Ok(ValidateOutcome { metadata, attempts })
        }
        Err(err) => {
            progress.failure(&format!(
                "Validation failed after {} attempt(s)",
                metadata.validation_attempts.unwrap_or_default()
            ));
            Err(err)
        }
    }
}

/// Result of the report stage.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    /// Rendered Markdown report.
    pub markdown: String,
    /// Machine-readable statistics.
    pub stats: CoverageStatsDocument,
}

/// Re-measure coverage, diff against the before snapshot, write the report.
pub async fn report(
    ctx: &StageContext,
    analyzer: &CoverageAnalyzer,
    progress: &dyn ProgressSink,
) -> PipelineResult<ReportOutcome> {
    progress.stage("Generating Coverage Improvement Report");
    let metadata: PipelineMetadata = ctx.load_json(StageArtifact::GenerationMetadata)?;
    let analysis: CoverageAnalysis = ctx.load_json(StageArtifact::CoverageAnalysis)?;
    let before_overall: OverallStats = ctx.load_json(StageArtifact::OverallCoverage)?;

    progress.step("Running post-improvement coverage analysis...");
    let measurement = analyzer.measure().await?;

    let (after_file, after_fallback) = match measurement.file(&metadata.original_file) {
        Some(stats) => (stats, false),
        None => {
            warn!(file = %metadata.original_file, "Target missing from post-validation coverage");
            progress.warning(&format!(
                "Could not find coverage data for {} after improvements; using the before snapshot",
                metadata.original_file
            ));
            (analysis.stats.clone(), true)
        }
    };
    let after_overall = measurement.overall();

    let input = ReportInput {
        metadata: &metadata,
        before_file: &analysis.stats,
        after_file: &after_file,
        before_overall: &before_overall,
        after_overall: &after_overall,
        after_fallback,
    };
    let markdown = render(&input);
    let stats = CoverageStatsDocument::from_input(&input);

    ctx.store().write(StageArtifact::Report, &markdown)?;
    ctx.save_json(StageArtifact::Stats, &stats)?;

    progress.success(&format!(
        "Report saved to {}",
        ctx.store().location(StageArtifact::Report)
    ));
    progress.step(&format!(
        "Detailed stats saved to {}",
        ctx.store().location(StageArtifact::Stats)
    ));

    Ok(ReportOutcome { markdown, stats })
}

/// Everything produced by a full run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Analyze stage result.
    pub analysis: AnalyzeOutcome,
    /// Generate stage result.
    pub generation: GenerateOutcome,
    /// Validate stage result.
    pub validation: ValidateOutcome,
    /// Report stage result.
    pub report: ReportOutcome,
}

/// Services needed by a full run.
pub struct PipelineServices<'a> {
    /// Coverage analyzer used before and after.
    pub analyzer: &'a CoverageAnalyzer,
    /// Candidate generator.
    pub generator: &'a TestGenerator,
    /// Validation retry loop.
    pub driver: &'a ValidationDriver,
}

/// Run all four stages in order, stopping at the first failure.
pub async fn run_all(
    ctx: &StageContext,
    services: &PipelineServices<'_>,
    progress: &dyn ProgressSink,
) -> PipelineResult<RunOutcome> {
    let analysis = analyze(ctx, services.analyzer, progress).await?;
    let generation = generate(ctx, services.generator, progress).await?;

    let stored: CoverageAnalysis = ctx.load_json(StageArtifact::CoverageAnalysis)?;
    let source = RegeneratingSource::new(ctx, services.generator, stored, progress);
    let validation = validate(ctx, services.driver, &source, progress).await?;

    let report = report(ctx, services.analyzer, progress).await?;

    Ok(RunOutcome {
        analysis,
        generation,
        validation,
        report,
    })
}
