//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::models::{Config, RetryStrategy, MAX_VALIDATION_ATTEMPTS};

#[derive(Parser, Debug)]
#[command(name = "covboost")]
#[command(about = "Closed-loop unit-test coverage improvement", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Additional YAML config file (overrides .covboost/*.yaml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for the intermediate stage files
    #[arg(short, long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Workspace root the oracles run in
    #[arg(short, long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Measure coverage and select the least-covered file
    Analyze,

    /// Generate tests for the selected file
    Generate(GenerateArgs),

    /// Validate the generated candidate (compile + test, rollback on failure)
    Validate(ValidateArgs),

    /// Re-measure coverage and write the before/after report
    Report,

    /// Run analyze, generate, validate and report in order
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Model identifier (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Do not embed sibling module files in the prompt
    #[arg(long)]
    pub no_module_context: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RetryArgs {
    /// Validation attempts (1-3)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_VALIDATION_ATTEMPTS)))]
    pub max_attempts: Option<u32>,

    /// Between failed attempts: regenerate or reuse the candidate
    #[arg(long, value_name = "STRATEGY")]
    pub retry_strategy: Option<RetryStrategy>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Model for regenerated candidates (defaults to the one recorded by generate)
    #[arg(short, long)]
    pub model: Option<String>,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub generate: GenerateArgs,

    #[command(flatten)]
    pub retry: RetryArgs,
}

impl GenerateArgs {
    /// Apply these flags to `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model.model.clone_from(model);
        }
        if self.no_module_context {
            config.model.include_module_context = false;
        }
    }
}

impl RetryArgs {
    /// Apply these flags to `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(max_attempts) = self.max_attempts {
            config.validation.max_attempts = max_attempts;
        }
        if let Some(strategy) = self.retry_strategy {
            config.validation.retry_strategy = strategy;
        }
    }
}

impl ValidateArgs {
    /// Apply these flags to `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model.model.clone_from(model);
        }
        self.retry.apply(config);
    }
}

impl Cli {
    /// Apply global and per-command flags to a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(dir) = &self.workspace {
            config.workspace_dir.clone_from(dir);
        }
        if let Some(level) = crate::infrastructure::logging::verbosity_level(self.verbose) {
            config.logging.level = level.to_string();
        }

        match &self.command {
            Commands::Generate(args) => args.apply(config),
            Commands::Validate(args) => args.apply(config),
            Commands::Run(args) => {
                args.generate.apply(config);
                args.retry.apply(config);
            }
            Commands::Analyze | Commands::Report => {}
        }
    }
}
