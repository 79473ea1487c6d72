//! covboost - closed-loop unit-test coverage improvement
//!
//! One run measures line coverage of a workspace, picks the least-covered
//! source file, asks a chat-completions model for unit tests, splices them
//! into the file, keeps the change only if the workspace still compiles and
//! its tests pass, and finally reports the before/after coverage delta.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): coverage models, metadata, errors and the
//!   ports the stages depend on
//! - **Service Layer** (`services`): the four stages and the validation
//!   state machine
//! - **Infrastructure Layer** (`infrastructure`): process oracles, the model
//!   HTTP client, stage storage, config and logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{PipelineError, PipelineResult};
pub use domain::models::{
    Config, CoverageAnalysis, FileCoverageFilter, FileStats, OverallStats, PipelineMetadata,
    RetryStrategy,
};
pub use domain::ports::{BuildOracle, CoverageOracle, ModelClient, StageArtifact, StageStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CoverageAnalyzer, StageContext, TestGenerator, ValidationDriver};
