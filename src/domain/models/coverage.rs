//! Coverage data model.
//!
//! [`CoverageReport`] mirrors the JSON export written by `cargo llvm-cov --json`:
//! a top-level `data` array whose first entry holds a `files` array. Every key is
//! optional on the way in; missing counters deserialize to zero so a partially
//! populated report never aborts the pipeline.

use serde::{Deserialize, Serialize};

/// Top-level coverage export produced by the coverage oracle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Export payloads; only the first one is consulted.
    #[serde(default)]
    pub data: Vec<CoverageExport>,

    /// Export type tag (e.g. `llvm.coverage.json.export`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Export format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CoverageReport {
    /// File entries of the first export payload, or an empty slice.
    pub fn files(&self) -> &[FileCoverage] {
        self.data.first().map_or(&[], |export| export.files.as_slice())
    }
}

/// One export payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageExport {
    /// Per-file coverage entries in oracle order.
    #[serde(default)]
    pub files: Vec<FileCoverage>,
}

/// Coverage entry for a single source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Path of the source file as reported by the oracle.
    #[serde(default)]
    pub filename: String,

    /// Aggregated counters.
    #[serde(default)]
    pub summary: CoverageSummary,
}

/// Line, region and function counters for one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Line counters.
    #[serde(default)]
    pub lines: CoverageCounter,
    /// Region counters.
    #[serde(default)]
    pub regions: CoverageCounter,
    /// Function counters.
    #[serde(default)]
    pub functions: CoverageCounter,
}

/// A `covered` / `count` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageCounter {
    /// Number of covered items.
    #[serde(default)]
    pub covered: u64,
    /// Number of instrumented items.
    #[serde(default)]
    pub count: u64,
}

impl CoverageCounter {
    /// Create a counter.
    pub const fn new(covered: u64, count: u64) -> Self {
        Self { covered, count }
    }
}

impl FileCoverage {
    /// Build an entry with line counters only. Mostly useful in tests.
    pub fn with_lines(filename: impl Into<String>, covered: u64, count: u64) -> Self {
        Self {
            filename: filename.into(),
            summary: CoverageSummary {
                lines: CoverageCounter::new(covered, count),
                ..Default::default()
            },
        }
    }

    /// Line coverage percentage, or `None` when no line is instrumented.
    pub fn coverage_percent(&self) -> Option<f64> {
        let lines = self.summary.lines;
        if lines.count == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(lines.covered as f64 / lines.count as f64 * 100.0)
    }
}

/// Coverage statistics for one eligible file.
///
/// This is the shape persisted in `coverage_analysis.json` under `stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    /// Source path.
    #[serde(default)]
    pub path: String,
    /// Line coverage percentage.
    #[serde(default)]
    pub coverage: f64,
    /// Covered lines.
    #[serde(default)]
    pub covered: u64,
    /// Instrumented lines.
    #[serde(default)]
    pub total: u64,
    /// Region counters.
    #[serde(default)]
    pub regions: CoverageCounter,
    /// Function counters.
    #[serde(default)]
    pub functions: CoverageCounter,
}

impl FileStats {
    /// Derive statistics from an oracle entry. `None` when `total == 0`.
    pub fn from_entry(entry: &FileCoverage) -> Option<Self> {
        let coverage = entry.coverage_percent()?;
        Some(Self {
            path: entry.filename.clone(),
            coverage,
            covered: entry.summary.lines.covered,
            total: entry.summary.lines.count,
            regions: entry.summary.regions,
            functions: entry.summary.functions,
        })
    }
}

/// Project-wide aggregate over all eligible files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    /// Number of eligible files.
    #[serde(default)]
    pub total_files: usize,
    /// Unweighted mean of per-file coverage percentages.
    #[serde(default)]
    pub average_coverage: f64,
}

/// Outcome of the selection policy.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    /// The file with the lowest coverage.
    pub worst: FileStats,
    /// Aggregate over every eligible file.
    pub overall: OverallStats,
}

/// Persisted form of the selection (`coverage_analysis.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAnalysis {
    /// Selected file path.
    pub file: String,
    /// Selected file coverage percentage.
    #[serde(default)]
    pub coverage: f64,
    /// Selected file statistics.
    pub stats: FileStats,
}

impl From<&SelectionResult> for CoverageAnalysis {
    fn from(selection: &SelectionResult) -> Self {
        Self {
            file: selection.worst.path.clone(),
            coverage: selection.worst.coverage,
            stats: selection.worst.clone(),
        }
    }
}

/// Predicate deciding which oracle entries are eligible for ranking.
///
/// The same filter instance must be used by the analyzer and by the report
/// stage, otherwise before/after statistics are computed over different sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverageFilter {
    /// Recognized source extensions, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Substrings marking build output or dependency caches.
    #[serde(default = "default_excluded_segments")]
    pub excluded_segments: Vec<String>,
    /// Substrings marking test-only directories.
    #[serde(default = "default_test_segments")]
    pub test_segments: Vec<String>,
    /// Filename suffixes marking test-only files.
    #[serde(default = "default_test_suffixes")]
    pub test_suffixes: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["rs".to_string()]
}

fn default_excluded_segments() -> Vec<String> {
    vec!["target/".to_string(), ".cargo/".to_string()]
}

fn default_test_segments() -> Vec<String> {
    vec!["/tests/".to_string()]
}

fn default_test_suffixes() -> Vec<String> {
    vec!["_test.rs".to_string()]
}

impl Default for FileCoverageFilter {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            excluded_segments: default_excluded_segments(),
            test_segments: default_test_segments(),
            test_suffixes: default_test_suffixes(),
        }
    }
}

impl FileCoverageFilter {
    /// Whether `path` is an eligible implementation source file.
    pub fn accepts(&self, path: &str) -> bool {
        let has_extension = self
            .extensions
            .iter()
            .any(|ext| path.ends_with(&format!(".{ext}")));
        if !has_extension {
            return false;
        }

        if self.excluded_segments.iter().any(|seg| path.contains(seg.as_str())) {
            return false;
        }

        if self.test_segments.iter().any(|seg| path.contains(seg.as_str())) {
            return false;
        }

        !self
            .test_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()))
    }
}
