use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, MAX_VALIDATION_ATTEMPTS};

/// Project configuration directory, relative to the workspace.
pub const CONFIG_DIR: &str = ".covboost";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "COVBOOST_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_attempts: {0}. Must be between 1 and {MAX_VALIDATION_ATTEMPTS}")]
    InvalidMaxAttempts(u32),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("{0} program cannot be empty")]
    EmptyProgram(&'static str),

    #[error("{0} timeout cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("Model base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("File filter must list at least one extension")]
    NoExtensions,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration rooted at the current directory.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        Self::load_from(Path::new("."), explicit)
    }

    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `<root>/.covboost/config.yaml`
    /// 3. `<root>/.covboost/local.yaml`
    /// 4. The explicit `--config` file, if any
    /// 5. Environment variables (`COVBOOST_*`, `__` separates nested keys)
    pub fn load_from(root: &Path, explicit: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(root.join(CONFIG_DIR).join("config.yaml")))
            .merge(Yaml::file(root.join(CONFIG_DIR).join("local.yaml")));

        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Default location of the project config file.
    pub fn project_config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join("config.yaml")
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let validation = &config.validation;
        if validation.max_attempts == 0 || validation.max_attempts > MAX_VALIDATION_ATTEMPTS {
            return Err(ConfigError::InvalidMaxAttempts(validation.max_attempts));
        }

        let programs = [
            ("Coverage", &config.coverage.program),
            ("Check", &validation.check_program),
            ("Test", &validation.test_program),
        ];
        for (name, program) in programs {
            if program.trim().is_empty() {
                return Err(ConfigError::EmptyProgram(name));
            }
        }

        let timeouts = [
            ("Coverage", config.coverage.timeout_secs),
            ("Check", validation.check_timeout_secs),
            ("Test", validation.test_timeout_secs),
            ("Model", config.model.timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }

        let model = &config.model;
        if model.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !(0.0..=2.0).contains(&model.temperature) {
            return Err(ConfigError::InvalidTemperature(model.temperature));
        }
        if model.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(model.max_tokens));
        }

        if config.filter.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{LogFormat, RetryStrategy};

    fn write_project_config(root: &Path, name: &str, yaml: &str) {
        let dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), yaml).unwrap();
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.output_dir, PathBuf::from("/tmp"));
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_validate_max_attempts_bounds() {
        let mut config = Config::default();
        config.validation.max_attempts = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxAttempts(0))
        ));

        config.validation.max_attempts = 4;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxAttempts(4))
        ));

        config.validation.max_attempts = 1;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other}"),
        }
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.validation.check_timeout_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroTimeout("Check"))
        ));
    }

    #[test]
    fn test_validate_empty_program() {
        let mut config = Config::default();
        config.coverage.program = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyProgram("Coverage"))
        ));
    }

    #[test]
    fn test_validate_model_parameters() {
        let mut config = Config::default();
        config.model.temperature = 2.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTemperature(_))
        ));

        let mut config = Config::default();
        config.model.max_tokens = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxTokens(0))
        ));
    }

    #[test]
    fn test_validate_empty_extensions() {
        let mut config = Config::default();
        config.filter.extensions.clear();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::NoExtensions)
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let root = tempfile::tempdir().unwrap();
        write_project_config(
            root.path(),
            "config.yaml",
            "validation:\n  max_attempts: 2\nlogging:\n  level: info\n  format: json\n",
        );
        write_project_config(root.path(), "local.yaml", "logging:\n  level: debug\n");

        let config = temp_env::with_vars_unset(
            ["COVBOOST_LOGGING__LEVEL", "COVBOOST_VALIDATION__MAX_ATTEMPTS"],
            || ConfigLoader::load_from(root.path(), None).unwrap(),
        );

        assert_eq!(config.validation.max_attempts, 2);
        assert_eq!(config.logging.level, "debug", "Local overrides project");
        assert_eq!(
            config.logging.format,
            LogFormat::Json,
            "Base value should persist when not overridden"
        );
    }

    #[test]
    fn test_explicit_file_overrides_project_files() {
        let root = tempfile::tempdir().unwrap();
        write_project_config(root.path(), "config.yaml", "model:\n  model: from-project\n");
        let explicit = root.path().join("ci.yaml");
        std::fs::write(&explicit, "model:\n  model: from-explicit\n").unwrap();

        let config = temp_env::with_var_unset("COVBOOST_MODEL__MODEL", || {
            ConfigLoader::load_from(root.path(), Some(&explicit)).unwrap()
        });
        assert_eq!(config.model.model, "from-explicit");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let result = ConfigLoader::load_from(root.path(), Some(&root.path().join("nope.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_override() {
        let root = tempfile::tempdir().unwrap();
        write_project_config(root.path(), "config.yaml", "validation:\n  max_attempts: 3\n");

        let config = temp_env::with_vars(
            [
                ("COVBOOST_VALIDATION__MAX_ATTEMPTS", Some("1")),
                ("COVBOOST_VALIDATION__RETRY_STRATEGY", Some("reuse")),
                ("COVBOOST_OUTPUT_DIR", Some("/var/tmp/covboost")),
            ],
            || ConfigLoader::load_from(root.path(), None).unwrap(),
        );

        assert_eq!(config.validation.max_attempts, 1);
        assert_eq!(config.validation.retry_strategy, RetryStrategy::Reuse);
        assert_eq!(config.output_dir, PathBuf::from("/var/tmp/covboost"));
    }

    #[test]
    fn test_invalid_env_value_fails_validation() {
        let root = tempfile::tempdir().unwrap();
        let result = temp_env::with_var("COVBOOST_VALIDATION__MAX_ATTEMPTS", Some("7"), || {
            ConfigLoader::load_from(root.path(), None)
        });
        assert!(result.is_err());
    }
}
