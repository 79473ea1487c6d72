//! Implementation of the `covboost run` command: every stage in order.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, ConsoleProgress};
use crate::domain::models::Config;
use crate::domain::ports::StageArtifact;
use crate::services::pipeline::{self, PipelineServices};
use crate::services::CoverageStatsDocument;

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub target_file: String,
    pub model: String,
    pub validation_attempts: u32,
    pub report_path: String,
    pub stats: CoverageStatsDocument,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let improvement = &self.stats.improvements;
        format!(
            "Improved {}: {:+.2}% file coverage ({:+} lines), {:+.2}% project average\n\
             Model: {}, validation attempts: {}\nReport: {}",
            self.target_file,
            improvement.file_coverage,
            improvement.lines_covered,
            improvement.overall_coverage,
            self.model,
            self.validation_attempts,
            self.report_path,
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let ctx = super::stage_context(config);
    let analyzer = super::coverage_analyzer(config);
    let generator = super::test_generator(config)?;
    let driver = super::validation_driver(config);
    let progress = ConsoleProgress::new(json_mode);

    let services = PipelineServices {
        analyzer: &analyzer,
        generator: &generator,
        driver: &driver,
    };
    let outcome = pipeline::run_all(&ctx, &services, &progress).await?;
    progress.finish();

    let metadata = outcome.validation.metadata;
    let result = RunOutput {
        target_file: metadata.original_file,
        model: metadata.model.unwrap_or_else(|| generator.model_name().to_string()),
        validation_attempts: metadata.validation_attempts.unwrap_or_default(),
        report_path: ctx.store().location(StageArtifact::Report),
        stats: outcome.report.stats,
    };
    output(&result, json_mode);
    Ok(())
}
