//! Cross-stage pipeline metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The durable cursor threaded from the generator through the validator to the
/// report stage (`test_generation_metadata.json`).
///
/// Every run overwrites it; nothing is merged from a previous run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Working-tree path of the target file.
    pub original_file: String,
    /// Location of the staged candidate content.
    pub generated_tests_path: String,
    /// Coverage percentage of the target before generation.
    #[serde(default)]
    pub coverage_before: f64,
    /// Model that produced the candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Validation outcome, absent until the validator has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_success: Option<bool>,
    /// Number of validation attempts performed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_attempts: Option<u32>,
    /// When the candidate was generated.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When validation finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
}

impl PipelineMetadata {
    /// Fresh metadata for a newly generated candidate.
    pub fn new(
        original_file: impl Into<String>,
        generated_tests_path: impl Into<String>,
        coverage_before: f64,
        model: Option<String>,
    ) -> Self {
        Self {
            original_file: original_file.into(),
            generated_tests_path: generated_tests_path.into(),
            coverage_before,
            model,
            validation_success: None,
            validation_attempts: None,
            created_at: Utc::now(),
            validated_at: None,
        }
    }

    /// Record the validator's verdict.
    pub fn record_validation(&mut self, success: bool, attempts: u32) {
        self.validation_success = Some(success);
        self.validation_attempts = Some(attempts);
        self.validated_at = Some(Utc::now());
    }

    /// Whether validation ran and succeeded.
    pub fn validated(&self) -> bool {
        self.validation_success.unwrap_or(false)
    }
}
