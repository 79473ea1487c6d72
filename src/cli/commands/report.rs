//! Implementation of the `covboost report` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, ConsoleProgress};
use crate::domain::models::Config;
use crate::domain::ports::StageArtifact;
use crate::services::pipeline;
use crate::services::CoverageStatsDocument;

#[derive(Debug, Serialize)]
pub struct ReportOutput {
    #[serde(skip)]
    pub markdown: String,
    pub report_path: String,
    pub stats_path: String,
    pub stats: CoverageStatsDocument,
}

impl CommandOutput for ReportOutput {
    fn to_human(&self) -> String {
        self.markdown.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let ctx = super::stage_context(config);
    let analyzer = super::coverage_analyzer(config);
    let progress = ConsoleProgress::new(json_mode);

    let outcome = pipeline::report(&ctx, &analyzer, &progress).await?;
    progress.finish();

    let result = ReportOutput {
        markdown: outcome.markdown,
        report_path: ctx.store().location(StageArtifact::Report),
        stats_path: ctx.store().location(StageArtifact::Stats),
        stats: outcome.stats,
    };
    output(&result, json_mode);
    Ok(())
}
