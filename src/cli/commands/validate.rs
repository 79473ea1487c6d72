//! Implementation of the `covboost validate` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, ConsoleProgress};
use crate::cli::types::ValidateArgs;
use crate::domain::models::{Config, CoverageAnalysis, PipelineMetadata, RetryStrategy};
use crate::domain::ports::StageArtifact;
use crate::services::pipeline::{self, RegeneratingSource, StoredCandidate};
use crate::services::{
    AttemptOutcome, AttemptReport, CandidateSource, ProgressSink, StageContext, TestGenerator,
    ValidationDriver,
};

/// Serializable summary of one validation attempt.
#[derive(Debug, Serialize)]
pub struct AttemptSummary {
    pub attempt: u32,
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&AttemptReport> for AttemptSummary {
    fn from(report: &AttemptReport) -> Self {
        match &report.outcome {
            AttemptOutcome::Committed => Self {
                attempt: report.attempt,
                committed: true,
                failed_at: None,
                reason: None,
            },
            AttemptOutcome::RolledBack {
                failed_at, reason, ..
            } => Self {
                attempt: report.attempt,
                committed: false,
                failed_at: Some(failed_at.to_string()),
                reason: Some(reason.clone()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub target_file: String,
    pub success: bool,
    pub attempts: Vec<AttemptSummary>,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Validated {} in {} attempt(s)",
            self.target_file,
            self.attempts.len()
        )];
        for attempt in &self.attempts {
            match (&attempt.failed_at, &attempt.reason) {
                (Some(stage), Some(reason)) => {
                    lines.push(format!("  #{} rolled back at {stage}: {reason}", attempt.attempt));
                }
                _ => lines.push(format!("  #{} committed", attempt.attempt)),
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Point `config` at the model that produced the stored candidate, unless
/// `--model` was given.
fn apply_recorded_model(config: &mut Config, model_flag: Option<&str>, metadata: &PipelineMetadata) {
    if model_flag.is_some() {
        return;
    }
    if let Some(model) = &metadata.model {
        config.model.model.clone_from(model);
    }
}

/// Generator for retries, using the model recorded by `generate`.
fn regenerating_generator(
    ctx: &StageContext,
    config: &Config,
    model_flag: Option<&str>,
) -> Result<TestGenerator> {
    let metadata: PipelineMetadata = ctx.load_json(StageArtifact::GenerationMetadata)?;
    let mut config = config.clone();
    apply_recorded_model(&mut config, model_flag, &metadata);
    super::test_generator(&config)
}

pub async fn execute(args: &ValidateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = super::stage_context(config);
    let driver = super::validation_driver(config);
    let progress = ConsoleProgress::new(json_mode);

    // Only build a model client when retries may need one.
    let generator = match config.validation.retry_strategy {
        RetryStrategy::Regenerate if driver.max_attempts() > 1 => {
            Some(regenerating_generator(&ctx, config, args.model.as_deref())?)
        }
        _ => None,
    };

    let outcome = match &generator {
        Some(generator) => {
            let analysis: CoverageAnalysis = ctx.load_json(StageArtifact::CoverageAnalysis)?;
            let source = RegeneratingSource::new(&ctx, generator, analysis, &progress);
            run_stage(&ctx, &driver, &source, &progress).await?
        }
        None => run_stage(&ctx, &driver, &StoredCandidate::new(&ctx), &progress).await?,
    };
    progress.finish();

    let result = ValidateOutput {
        target_file: outcome.metadata.original_file.clone(),
        success: outcome.metadata.validated(),
        attempts: outcome.attempts.iter().map(AttemptSummary::from).collect(),
    };
    output(&result, json_mode);
    Ok(())
}

async fn run_stage(
    ctx: &StageContext,
    driver: &ValidationDriver,
    source: &dyn CandidateSource,
    progress: &dyn ProgressSink,
) -> Result<pipeline::ValidateOutcome> {
    Ok(pipeline::validate(ctx, driver, source, progress).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::infrastructure::state::InMemoryStageStore;
    use crate::services::validator::FailedTransition;
    use crate::services::AttemptState;

    fn context_with_metadata(model: Option<&str>) -> StageContext {
        let ctx = StageContext::new(Arc::new(InMemoryStageStore::new()), "/work");
        let metadata = PipelineMetadata::new(
            "src/b.rs",
            "memory://updated_file.rs",
            20.0,
            model.map(ToString::to_string),
        );
        ctx.save_json(StageArtifact::GenerationMetadata, &metadata).unwrap();
        ctx
    }

    #[test]
    fn retries_regenerate_with_model_recorded_by_generate() {
        let ctx = context_with_metadata(Some("gpt-4.1-nano"));
        let config = Config::default();

        let generator = temp_env::with_var_unset("GITHUB_TOKEN", || {
            regenerating_generator(&ctx, &config, None)
        })
        .unwrap();

        assert_eq!(generator.model_name(), "gpt-4.1-nano");
    }

    #[test]
    fn model_flag_overrides_recorded_model() {
        let ctx = context_with_metadata(Some("gpt-4.1-nano"));
        let mut config = Config::default();
        config.model.model = "gpt-4o".to_string();

        let generator = temp_env::with_var_unset("GITHUB_TOKEN", || {
            regenerating_generator(&ctx, &config, Some("gpt-4o"))
        })
        .unwrap();

        assert_eq!(generator.model_name(), "gpt-4o");
    }

    #[test]
    fn configured_model_used_when_none_recorded() {
        let ctx = context_with_metadata(None);
        let mut config = Config::default();
        config.model.model = "custom-model".to_string();

        let generator = temp_env::with_var_unset("GITHUB_TOKEN", || {
            regenerating_generator(&ctx, &config, None)
        })
        .unwrap();

        assert_eq!(generator.model_name(), "custom-model");
    }

    #[test]
    fn regenerating_generator_requires_metadata() {
        let ctx = StageContext::new(Arc::new(InMemoryStageStore::new()), "/work");
        let err = regenerating_generator(&ctx, &Config::default(), None).unwrap_err();
        assert!(err.to_string().contains("test_generation_metadata.json"));
    }

    #[test]
    fn summary_reports_failed_transition() {
        let report = AttemptReport {
            attempt: 2,
            states: vec![AttemptState::Init, AttemptState::Staged],
            outcome: AttemptOutcome::RolledBack {
                failed_at: FailedTransition::Test,
                reason: "1 failed".to_string(),
                diagnostics: String::new(),
            },
        };
        let summary = AttemptSummary::from(&report);
        assert!(!summary.committed);
        assert_eq!(summary.failed_at.as_deref(), Some("test run"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["attempt"], 2);
        assert_eq!(json["reason"], "1 failed");
    }
}
