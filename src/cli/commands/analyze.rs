//! Implementation of the `covboost analyze` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{least_covered_table, output, CommandOutput, ConsoleProgress};
use crate::domain::models::{Config, FileStats, OverallStats};
use crate::domain::ports::StageArtifact;
use crate::services::pipeline;

#[derive(Debug, Serialize)]
pub struct AnalyzeOutput {
    pub file: String,
    pub coverage: f64,
    pub covered_lines: u64,
    pub total_lines: u64,
    pub overall: OverallStats,
    pub least_covered: Vec<FileStats>,
    pub analysis_path: String,
}

impl CommandOutput for AnalyzeOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            String::new(),
            "Least covered files:".to_string(),
            least_covered_table(&self.least_covered),
            String::new(),
            format!(
                "Selected: {} ({:.2}%, {}/{} lines)",
                self.file, self.coverage, self.covered_lines, self.total_lines
            ),
            format!(
                "Project: {} files, {:.2}% average coverage",
                self.overall.total_files, self.overall.average_coverage
            ),
        ];
        lines.push(format!("Analysis saved to {}", self.analysis_path));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let ctx = super::stage_context(config);
    let analyzer = super::coverage_analyzer(config);
    let progress = ConsoleProgress::new(json_mode);

    let outcome = pipeline::analyze(&ctx, &analyzer, &progress).await?;
    progress.finish();

    let worst = outcome.selection.worst;
    let result = AnalyzeOutput {
        file: worst.path,
        coverage: worst.coverage,
        covered_lines: worst.covered,
        total_lines: worst.total,
        overall: outcome.selection.overall,
        least_covered: outcome.least_covered,
        analysis_path: ctx.store().location(StageArtifact::CoverageAnalysis),
    };
    output(&result, json_mode);
    Ok(())
}
