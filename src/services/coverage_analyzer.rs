//! Coverage analysis: eligibility filtering, ranking and selection.
//!
//! The statistics extraction here is shared by the analyze stage and by the
//! report stage's after-measurement, so both see exactly the same eligible set.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::{
    CoverageReport, FileCoverageFilter, FileStats, OverallStats, SelectionResult,
};
use crate::domain::ports::CoverageOracle;

/// Apply `filter` and compute per-file statistics.
///
/// Entries with no instrumented lines are dropped. The result keeps the
/// oracle's original relative order.
pub fn extract_file_stats(report: &CoverageReport, filter: &FileCoverageFilter) -> Vec<FileStats> {
    report
        .files()
        .iter()
        .filter(|entry| filter.accepts(&entry.filename))
        .filter_map(FileStats::from_entry)
        .collect()
}

/// Unweighted mean of per-file coverage. Zero files yields zero.
pub fn overall_stats(stats: &[FileStats]) -> OverallStats {
    if stats.is_empty() {
        return OverallStats::default();
    }

    let sum: f64 = stats.iter().map(|s| s.coverage).sum();
    #[allow(clippy::cast_precision_loss)]
    let average_coverage = sum / stats.len() as f64;

    OverallStats {
        total_files: stats.len(),
        average_coverage,
    }
}

/// Stable ascending sort by coverage; ties keep their original order.
pub fn rank(stats: &[FileStats]) -> Vec<FileStats> {
    let mut ranked = stats.to_vec();
    ranked.sort_by(|a, b| a.coverage.total_cmp(&b.coverage));
    ranked
}

/// Pick the least-covered file.
///
/// The aggregate is computed over the unsorted input.
pub fn select_worst(stats: &[FileStats]) -> PipelineResult<SelectionResult> {
    let worst = rank(stats)
        .into_iter()
        .next()
        .ok_or(PipelineError::NoCoverageData)?;

    Ok(SelectionResult {
        worst,
        overall: overall_stats(stats),
    })
}

/// Find `path` among the eligible files of a report.
pub fn find_file_stats(stats: &[FileStats], path: &str) -> Option<FileStats> {
    stats.iter().find(|s| s.path == path).cloned()
}

/// One complete measurement: eligible stats in oracle order.
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Eligible files in oracle order.
    pub files: Vec<FileStats>,
}

impl Measurement {
    /// Aggregate over all eligible files.
    pub fn overall(&self) -> OverallStats {
        overall_stats(&self.files)
    }

    /// Apply the selection policy.
    pub fn select(&self) -> PipelineResult<SelectionResult> {
        select_worst(&self.files)
    }

    /// The `n` least-covered files.
    pub fn least_covered(&self, n: usize) -> Vec<FileStats> {
        rank(&self.files).into_iter().take(n).collect()
    }

    /// Statistics of one file, if it is still eligible.
    pub fn file(&self, path: &str) -> Option<FileStats> {
        find_file_stats(&self.files, path)
    }
}

/// Runs the coverage oracle and extracts eligible statistics.
pub struct CoverageAnalyzer {
    oracle: Arc<dyn CoverageOracle>,
    filter: FileCoverageFilter,
}

impl CoverageAnalyzer {
    /// Create an analyzer over the given oracle and filter.
    pub fn new(oracle: Arc<dyn CoverageOracle>, filter: FileCoverageFilter) -> Self {
        Self { oracle, filter }
    }

    /// Invoke the oracle and extract eligible file statistics.
    #[instrument(skip(self))]
    pub async fn measure(&self) -> PipelineResult<Measurement> {
        let report = self.oracle.measure().await?;
        let files = extract_file_stats(&report, &self.filter);

        info!(
            reported = report.files().len(),
            eligible = files.len(),
            "Extracted file coverage"
        );

        Ok(Measurement { files })
    }
}
