//! CLI command implementations.
//!
//! Each command wires the infrastructure adapters chosen by the loaded
//! [`Config`] into the stage functions of [`crate::services::pipeline`].

pub mod analyze;
pub mod generate;
pub mod report;
pub mod run;
pub mod validate;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::types::Commands;
use crate::domain::models::Config;
use crate::infrastructure::models::ChatCompletionsClient;
use crate::infrastructure::oracles::{CargoBuildOracle, LlvmCovOracle};
use crate::infrastructure::state::FileStageStore;
use crate::services::{CoverageAnalyzer, StageContext, TestGenerator, TestValidator, ValidationDriver};

/// Stage context persisting to `config.output_dir`.
pub fn stage_context(config: &Config) -> StageContext {
    let store = Arc::new(FileStageStore::new(&config.output_dir));
    StageContext::new(store, &config.workspace_dir)
}

/// Analyzer backed by the configured coverage command.
pub fn coverage_analyzer(config: &Config) -> CoverageAnalyzer {
    let oracle = Arc::new(LlvmCovOracle::from_config(&config.coverage, &config.workspace_dir));
    CoverageAnalyzer::new(oracle, config.filter.clone())
}

/// Generator backed by the chat-completions service.
pub fn test_generator(config: &Config) -> Result<TestGenerator> {
    let client = ChatCompletionsClient::from_config(&config.model)
        .context("Failed to create model client")?;
    Ok(TestGenerator::new(Arc::new(client), &config.model.language)
        .with_module_context(config.model.include_module_context))
}

/// Retry loop backed by the configured check and test commands.
pub fn validation_driver(config: &Config) -> ValidationDriver {
    let oracle = Arc::new(CargoBuildOracle::from_config(&config.validation, &config.workspace_dir));
    ValidationDriver::new(
        TestValidator::new(oracle),
        config.validation.max_attempts,
        config.validation.retry_strategy,
    )
}

/// Dispatch a parsed command.
pub async fn execute(command: Commands, config: &Config, json_mode: bool) -> Result<()> {
    match command {
        Commands::Analyze => analyze::execute(config, json_mode).await,
        Commands::Generate(_) => generate::execute(config, json_mode).await,
        Commands::Validate(args) => validate::execute(&args, config, json_mode).await,
        Commands::Report => report::execute(config, json_mode).await,
        Commands::Run(_) => run::execute(config, json_mode).await,
    }
}
