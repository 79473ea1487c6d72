//! Implementation of the `covboost generate` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, ConsoleProgress};
use crate::domain::models::Config;
use crate::services::pipeline;

#[derive(Debug, Serialize)]
pub struct GenerateOutput {
    pub target_file: String,
    pub model: String,
    pub test_lines: usize,
    pub coverage_before: f64,
    pub candidate_path: String,
}

impl CommandOutput for GenerateOutput {
    fn to_human(&self) -> String {
        format!(
            "Generated {} lines of tests for {} with {}\nCandidate: {}",
            self.test_lines, self.target_file, self.model, self.candidate_path
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let ctx = super::stage_context(config);
    let generator = super::test_generator(config)?;
    let progress = ConsoleProgress::new(json_mode);

    let outcome = pipeline::generate(&ctx, &generator, &progress).await?;
    progress.finish();

    let result = GenerateOutput {
        target_file: outcome.metadata.original_file,
        model: outcome.candidate.model,
        test_lines: outcome.candidate.tests.lines().count(),
        coverage_before: outcome.metadata.coverage_before,
        candidate_path: outcome.metadata.generated_tests_path,
    };
    output(&result, json_mode);
    Ok(())
}
