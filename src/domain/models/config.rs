use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::coverage::FileCoverageFilter;

/// Hard ceiling on validation attempts per run.
pub const MAX_VALIDATION_ATTEMPTS: u32 = 3;

/// Main configuration structure for covboost
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Workspace root; every oracle process runs here
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Directory holding the intermediate stage files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Coverage oracle configuration
    #[serde(default)]
    pub coverage: CoverageConfig,

    /// Eligibility filter shared by analysis and reporting
    #[serde(default)]
    pub filter: FileCoverageFilter,

    /// Model service configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            output_dir: default_output_dir(),
            coverage: CoverageConfig::default(),
            filter: FileCoverageFilter::default(),
            model: ModelConfig::default(),
            validation: ValidationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Coverage oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoverageConfig {
    /// Program to run
    #[serde(default = "default_cargo")]
    pub program: String,

    /// Arguments passed to the program
    #[serde(default = "default_coverage_args")]
    pub args: Vec<String>,

    /// Read the JSON report from this file instead of stdout
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Timeout in seconds
    #[serde(default = "default_coverage_timeout")]
    pub timeout_secs: u64,
}

fn default_cargo() -> String {
    "cargo".to_string()
}

fn default_coverage_args() -> Vec<String> {
    [
        "llvm-cov",
        "--json",
        "--workspace",
        "--",
        "--skip",
        "integration",
        "--nocapture",
        "--test-threads=8",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

const fn default_coverage_timeout() -> u64 {
    600
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            program: default_cargo(),
            args: default_coverage_args(),
            report_path: None,
            timeout_secs: default_coverage_timeout(),
        }
    }
}

/// Model service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Base URL of the chat-completions service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Output token bound
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// Environment variable holding the bearer credential
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Language tag of the fenced block to extract
    #[serde(default = "default_language")]
    pub language: String,

    /// Embed sibling source files in the prompt
    #[serde(default = "default_true")]
    pub include_module_context: bool,
}

fn default_base_url() -> String {
    "https://models.inference.ai.azure.com".to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    4000
}

const fn default_model_timeout() -> u64 {
    120
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_language() -> String {
    "rust".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout(),
            token_env: default_token_env(),
            language: default_language(),
            include_module_context: default_true(),
        }
    }
}

/// What the validator does between failed attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Ask the model for a fresh candidate before each retry
    #[default]
    Regenerate,
    /// Re-validate the identical candidate (only helps against flaky oracles)
    Reuse,
}

impl std::fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regenerate => write!(f, "regenerate"),
            Self::Reuse => write!(f, "reuse"),
        }
    }
}

impl std::str::FromStr for RetryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regenerate" => Ok(Self::Regenerate),
            "reuse" => Ok(Self::Reuse),
            other => Err(format!(
                "invalid retry strategy '{other}', expected 'regenerate' or 'reuse'"
            )),
        }
    }
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidationConfig {
    /// Compile-check program
    #[serde(default = "default_cargo")]
    pub check_program: String,

    /// Compile-check arguments
    #[serde(default = "default_check_args")]
    pub check_args: Vec<String>,

    /// Compile-check timeout in seconds
    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,

    /// Test program
    #[serde(default = "default_cargo")]
    pub test_program: String,

    /// Test arguments
    #[serde(default = "default_test_args")]
    pub test_args: Vec<String>,

    /// Test timeout in seconds
    #[serde(default = "default_test_timeout")]
    pub test_timeout_secs: u64,

    /// Attempts before giving up (1-3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Behavior between failed attempts
    #[serde(default)]
    pub retry_strategy: RetryStrategy,
}

fn default_check_args() -> Vec<String> {
    vec!["check".to_string(), "--workspace".to_string()]
}

const fn default_check_timeout() -> u64 {
    300
}

fn default_test_args() -> Vec<String> {
    ["test", "--workspace", "--", "--skip", "integration", "--nocapture"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

const fn default_test_timeout() -> u64 {
    600
}

const fn default_max_attempts() -> u32 {
    MAX_VALIDATION_ATTEMPTS
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_program: default_cargo(),
            check_args: default_check_args(),
            check_timeout_secs: default_check_timeout(),
            test_program: default_cargo(),
            test_args: default_test_args(),
            test_timeout_secs: default_test_timeout(),
            max_attempts: default_max_attempts(),
            retry_strategy: RetryStrategy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling JSON log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// Console log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Human-readable
    #[default]
    Pretty,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_timeouts() {
        let config = Config::default();
        assert_eq!(config.model.model, "gpt-4.1-mini");
        assert_eq!(config.model.timeout_secs, 120);
        assert_eq!(config.validation.check_timeout_secs, 300);
        assert_eq!(config.validation.test_timeout_secs, 600);
        assert_eq!(config.validation.max_attempts, 3);
        assert_eq!(config.validation.retry_strategy, RetryStrategy::Regenerate);
    }

    #[test]
    fn test_args_skip_integration_tests() {
        let config = ValidationConfig::default();
        assert_eq!(
            config.test_args,
            vec!["test", "--workspace", "--", "--skip", "integration", "--nocapture"]
        );
    }

    #[test]
    fn retry_strategy_parses_case_insensitively() {
        assert_eq!("Reuse".parse::<RetryStrategy>(), Ok(RetryStrategy::Reuse));
        assert_eq!(
            "regenerate".parse::<RetryStrategy>(),
            Ok(RetryStrategy::Regenerate)
        );
        assert!("again".parse::<RetryStrategy>().is_err());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r"
validation:
  max_attempts: 2
model:
  model: gpt-4o
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.validation.max_attempts, 2);
        assert_eq!(config.validation.check_program, "cargo");
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.token_env, "GITHUB_TOKEN");
        assert_eq!(config.filter, FileCoverageFilter::default());
    }
}
