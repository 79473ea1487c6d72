//! Before/after diffing and report rendering.

use serde::{Deserialize, Serialize};

use crate::domain::models::{FileStats, OverallStats, PipelineMetadata};

/// File-level improvement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FileDelta {
    /// Percentage-point change in coverage.
    pub percent_delta: f64,
    /// Change in covered lines.
    pub line_delta: i64,
}

/// Subtract `before` from `after`.
#[allow(clippy::cast_possible_wrap)]
pub fn diff_file(before: &FileStats, after: &FileStats) -> FileDelta {
    FileDelta {
        percent_delta: after.coverage - before.coverage,
        line_delta: after.covered as i64 - before.covered as i64,
    }
}

/// Percentage-point change of the project-wide average.
pub fn diff_overall(before: &OverallStats, after: &OverallStats) -> f64 {
    after.average_coverage - before.average_coverage
}

/// Inputs of one report.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    /// Cross-stage record.
    pub metadata: &'a PipelineMetadata,
    /// Target statistics before generation.
    pub before_file: &'a FileStats,
    /// Target statistics after validation.
    pub after_file: &'a FileStats,
    /// Project aggregate before generation.
    pub before_overall: &'a OverallStats,
    /// Project aggregate after validation.
    pub after_overall: &'a OverallStats,
    /// `after_file` is a copy of `before_file` because the target was absent
    /// from the new measurement.
    pub after_fallback: bool,
}

/// Render the Markdown report.
pub fn render(input: &ReportInput<'_>) -> String {
    let ReportInput {
        metadata,
        before_file,
        after_file,
        before_overall,
        after_overall,
        after_fallback,
    } = input;

    let file_delta = diff_file(before_file, after_file);
    let overall_delta = diff_overall(before_overall, after_overall);
    let validated = metadata.validated();

    let mut out = String::new();
    out.push_str("# Coverage Improvement Report\n\n");
    out.push_str("## Summary\n\n");
    if validated {
        out.push_str(
            "This automated workflow has successfully generated and validated new unit tests to improve code coverage.\n\n",
        );
    } else {
        out.push_str(
            "This automated workflow generated new unit tests, but they did not pass validation. The original file was left unchanged.\n\n",
        );
    }

    out.push_str("## Target File\n\n");
    out.push_str(&format!("**File:** `{}`\n\n", metadata.original_file));

    out.push_str("## File Coverage Results\n\n");
    if *after_fallback {
        out.push_str(
            "> **Note:** the target file was not found in the post-validation measurement; the \"After\" column repeats the \"Before\" snapshot.\n\n",
        );
    }
    out.push_str("| Metric | Before | After | Improvement |\n");
    out.push_str("|--------|--------|-------|-------------|\n");
    out.push_str(&format!(
        "| **Coverage Percentage** | {:.2}% | {:.2}% | **{:+.2}%** |\n",
        before_file.coverage, after_file.coverage, file_delta.percent_delta
    ));
    out.push_str(&format!(
        "| **Lines Covered** | {}/{} | {}/{} | **{:+} lines** |\n",
        before_file.covered,
        before_file.total,
        after_file.covered,
        after_file.total,
        file_delta.line_delta
    ));
    out.push_str(&format!(
        "| **Functions Covered** | {}/{} | {}/{} | - |\n\n",
        before_file.functions.covered,
        before_file.functions.count,
        after_file.functions.covered,
        after_file.functions.count
    ));

    out.push_str("## Overall Project Coverage\n\n");
    out.push_str("| Metric | Before | After | Change |\n");
    out.push_str("|--------|--------|-------|--------|\n");
    out.push_str(&format!(
        "| **Average Coverage** | {:.2}% | {:.2}% | **{:+.2}%** |\n",
        before_overall.average_coverage, after_overall.average_coverage, overall_delta
    ));
    out.push_str(&format!(
        "| **Total Files Analyzed** | {} | {} | - |\n\n",
        before_overall.total_files, after_overall.total_files
    ));

    let attempts = metadata
        .validation_attempts
        .map_or_else(|| "N/A".to_string(), |n| n.to_string());
    let status = if validated { "✅ Success" } else { "❌ Failed" };
    let model = metadata.model.as_deref().unwrap_or("unknown model");
    out.push_str("## Details\n\n");
    out.push_str(&format!("- **Validation Attempts:** {attempts}\n"));
    out.push_str(&format!("- **Validation Status:** {status}\n"));
    out.push_str(&format!("- **Test Generation Method:** GitHub Models API ({model})\n\n"));

    out.push_str("## Next Steps\n\n");
    out.push_str(
        "This change contains automatically generated unit tests. Please review the tests to ensure they:\n",
    );
    out.push_str("- Follow project coding standards\n");
    out.push_str("- Test meaningful scenarios\n");
    out.push_str("- Are maintainable and well-documented\n\n");
    out.push_str("---\n");
    out.push_str("*This report was automatically generated by covboost.*\n");

    out
}

/// Before or after half of [`CoverageStatsDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Target file statistics.
    pub file: FileStats,
    /// Project aggregate.
    pub overall: OverallStats,
}

/// Improvement figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Improvements {
    /// Percentage-point change for the target file.
    pub file_coverage: f64,
    /// Covered-line change for the target file.
    pub lines_covered: i64,
    /// Percentage-point change of the project average.
    pub overall_coverage: f64,
}

/// Machine-readable companion of the report (`coverage_stats.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageStatsDocument {
    /// Target file path.
    pub target_file: String,
    /// Snapshot before generation.
    pub before: StatsSnapshot,
    /// Snapshot after validation.
    pub after: StatsSnapshot,
    /// Differences.
    pub improvements: Improvements,
    /// The after-file snapshot is the before-file fallback.
    #[serde(default)]
    pub after_fallback: bool,
}

impl CoverageStatsDocument {
    /// Assemble the document from report inputs.
    pub fn from_input(input: &ReportInput<'_>) -> Self {
        let file_delta = diff_file(input.before_file, input.after_file);
        Self {
            target_file: input.metadata.original_file.clone(),
            before: StatsSnapshot {
                file: input.before_file.clone(),
                overall: *input.before_overall,
            },
            after: StatsSnapshot {
                file: input.after_file.clone(),
                overall: *input.after_overall,
            },
            improvements: Improvements {
                file_coverage: file_delta.percent_delta,
                lines_covered: file_delta.line_delta,
                overall_coverage: diff_overall(input.before_overall, input.after_overall),
            },
            after_fallback: input.after_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CoverageCounter, FileCoverage};

    fn file(covered: u64, total: u64) -> FileStats {
        let mut stats = FileStats::from_entry(&FileCoverage::with_lines("src/b.rs", covered, total)).unwrap();
        stats.functions = CoverageCounter::new(1, 4);
        stats
    }

    fn metadata(success: bool) -> PipelineMetadata {
        let mut metadata = PipelineMetadata::new(
            "src/b.rs",
            "/tmp/updated_file.rs",
            20.0,
            Some("gpt-4o-mini".to_string()),
        );
        metadata.record_validation(success, 2);
        metadata
    }

    #[test]
    fn diff_is_plain_subtraction() {
        let delta = diff_file(&file(2, 10), &file(7, 10));
        assert!((delta.percent_delta - 50.0).abs() < 1e-9);
        assert_eq!(delta.line_delta, 5);

        let regression = diff_file(&file(7, 10), &file(2, 10));
        assert_eq!(regression.line_delta, -5);

        let before = OverallStats {
            total_files: 2,
            average_coverage: 60.0,
        };
        let after = OverallStats {
            total_files: 2,
            average_coverage: 62.5,
        };
        assert!((diff_overall(&before, &after) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn render_contains_tables_and_details() {
        let metadata = metadata(true);
        let before = file(2, 10);
        let after = file(7, 10);
        let before_overall = OverallStats {
            total_files: 2,
            average_coverage: 60.0,
        };
        let after_overall = OverallStats {
            total_files: 2,
            average_coverage: 85.0,
        };
        let report = render(&ReportInput {
            metadata: &metadata,
            before_file: &before,
            after_file: &after,
            before_overall: &before_overall,
            after_overall: &after_overall,
            after_fallback: false,
        });

        assert!(report.starts_with("# Coverage Improvement Report\n"));
        assert!(report.contains("**File:** `src/b.rs`"));
        assert!(report.contains("| **Coverage Percentage** | 20.00% | 70.00% | **+50.00%** |"));
        assert!(report.contains("| **Lines Covered** | 2/10 | 7/10 | **+5 lines** |"));
        assert!(report.contains("| **Functions Covered** | 1/4 | 1/4 | - |"));
        assert!(report.contains("| **Average Coverage** | 60.00% | 85.00% | **+25.00%** |"));
        assert!(report.contains("| **Total Files Analyzed** | 2 | 2 | - |"));
        assert!(report.contains("- **Validation Attempts:** 2"));
        assert!(report.contains("✅ Success"));
        assert!(report.contains("GitHub Models API (gpt-4o-mini)"));
        assert!(!report.contains("**Note:**"));
    }

    #[test]
    fn render_separates_sections_with_blank_lines() {
        let metadata = metadata(true);
        let stats = file(2, 10);
        let overall = OverallStats::default();
        let report = render(&ReportInput {
            metadata: &metadata,
            before_file: &stats,
            after_file: &stats,
            before_overall: &overall,
            after_overall: &overall,
            after_fallback: false,
        });

        assert!(report.contains("# Coverage Improvement Report\n\n## Summary\n\nThis automated"));
        assert!(report.contains("coverage.\n\n## Target File\n\n**File:** `src/b.rs`\n\n## File Coverage Results\n\n| Metric"));
        assert!(report.contains("| - |\n\n## Overall Project Coverage\n\n| Metric | Before | After | Change |\n|--------|"));
        assert!(report.contains("(gpt-4o-mini)\n\n## Next Steps\n\n"));
        assert!(report.ends_with("documented\n\n---\n*This report was automatically generated by covboost.*\n"));
    }

    #[test]
    fn render_flags_fallback_and_failure() {
        let metadata = metadata(false);
        let before = file(2, 10);
        let overall = OverallStats::default();
        let report = render(&ReportInput {
            metadata: &metadata,
            before_file: &before,
            after_file: &before,
            before_overall: &overall,
            after_overall: &overall,
            after_fallback: true,
        });

        assert!(report.contains("**Note:**"));
        assert!(report.contains("**+0.00%**"));
        assert!(report.contains("**+0 lines**"));
        assert!(report.contains("❌ Failed"));
        assert!(report.contains("did not pass validation"));
    }

    #[test]
    fn render_without_validation_shows_not_available() {
        let metadata = PipelineMetadata::new("src/b.rs", "/tmp/updated_file.rs", 20.0, None);
        let before = file(2, 10);
        let overall = OverallStats::default();
        let report = render(&ReportInput {
            metadata: &metadata,
            before_file: &before,
            after_file: &before,
            before_overall: &overall,
            after_overall: &overall,
            after_fallback: false,
        });
        assert!(report.contains("- **Validation Attempts:** N/A"));
        assert!(report.contains("(unknown model)"));
    }

    #[test]
    fn stats_document_uses_stable_keys() {
        let metadata = metadata(true);
        let before = file(2, 10);
        let after = file(4, 10);
        let overall = OverallStats {
            total_files: 1,
            average_coverage: 20.0,
        };
        let after_overall = OverallStats {
            total_files: 1,
            average_coverage: 40.0,
        };
        let document = CoverageStatsDocument::from_input(&ReportInput {
            metadata: &metadata,
            before_file: &before,
            after_file: &after,
            before_overall: &overall,
            after_overall: &after_overall,
            after_fallback: false,
        });

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["target_file"], "src/b.rs");
        assert_eq!(value["before"]["file"]["covered"], 2);
        assert_eq!(value["after"]["overall"]["total_files"], 1);
        assert_eq!(value["improvements"]["lines_covered"], 2);
        assert!((value["improvements"]["overall_coverage"].as_f64().unwrap() - 20.0).abs() < 1e-9);
    }
}
