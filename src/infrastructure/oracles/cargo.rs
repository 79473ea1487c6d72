//! Build oracle running `cargo check` and `cargo test` over the workspace.
//!
//! Success is decided by exit status alone. The output is additionally parsed
//! into a one-line digest (error count, test tally, failing test names) for the
//! operator; the raw streams are kept verbatim in the [`OracleRun`].

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::domain::errors::PipelineResult;
use crate::domain::models::ValidationConfig;
use crate::domain::ports::{BuildOracle, OracleRun};

use super::process::{self, CommandSpec, ProcessOutput};

/// Compiler diagnostics digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Number of errors (authoritative count from the abort line if present).
    pub error_count: u32,
    /// `error…` lines in order.
    pub errors: Vec<String>,
}

impl BuildSummary {
    /// Parse compiler output to extract error count and error messages.
    ///
    /// rustc's `aborting due to N previous errors` and cargo's `could not
    /// compile ... due to N previous errors` lines are totals, not errors of
    /// their own; when present the last one gives the count.
    pub fn parse(stderr: &str) -> Self {
        let mut errors = Vec::new();
        let mut reported: Option<u32> = None;

        for line in stderr.lines() {
            let trimmed = line.trim();
            if !trimmed.starts_with("error") {
                continue;
            }
            if is_total_line(trimmed) {
                if let Some(count) = previous_error_count(trimmed) {
                    reported = Some(count);
                }
                continue;
            }
            errors.push(trimmed.to_string());
        }

        #[allow(clippy::cast_possible_truncation)]
        let error_count = reported.unwrap_or(errors.len() as u32);
        Self {
            error_count,
            errors,
        }
    }

    /// One-line digest.
    pub fn digest(&self) -> String {
        match self.errors.first() {
            Some(first) => format!("{} compile error(s); first: {first}", self.error_count),
            None => "compilation failed".to_string(),
        }
    }
}

fn is_total_line(line: &str) -> bool {
    line.starts_with("error: aborting due to ") || line.starts_with("error: could not compile")
}

/// `N` from `... due to N previous error(s)`.
fn previous_error_count(line: &str) -> Option<u32> {
    let (_, rest) = line.split_once("due to ")?;
    rest.split_whitespace().next()?.parse().ok()
}

/// libtest results digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSummary {
    /// Passed tests.
    pub passed: u32,
    /// Failed tests.
    pub failed: u32,
    /// Ignored tests.
    pub ignored: u32,
    /// Names of failing tests.
    pub failing_tests: Vec<String>,
}

impl TestSummary {
    /// Parse test runner output.
    ///
    /// Per-binary `test result:` lines are summed (a workspace run prints one
    /// per test binary). Without any summary line the per-test `... ok` /
    /// `... FAILED` / `... ignored` lines are counted instead.
    pub fn parse(stdout: &str, stderr: &str) -> Self {
        let combined = format!("{stdout}\n{stderr}");
        let mut counted = Self::default();
        let mut summed = Self::default();
        let mut saw_summary = false;

        for line in combined.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with("test result:") {
                saw_summary = true;
                summed.passed += extract_count(trimmed, "passed").unwrap_or(0);
                summed.failed += extract_count(trimmed, "failed").unwrap_or(0);
                summed.ignored += extract_count(trimmed, "ignored").unwrap_or(0);
            } else if trimmed.starts_with("test ") {
                if trimmed.ends_with("... ok") {
                    counted.passed += 1;
                } else if let Some(name) = trimmed
                    .strip_prefix("test ")
                    .and_then(|s| s.strip_suffix(" ... FAILED"))
                {
                    counted.failed += 1;
                    counted.failing_tests.push(name.trim().to_string());
                } else if trimmed.ends_with("... ignored") {
                    counted.ignored += 1;
                }
            }
        }

        if saw_summary {
            summed.failing_tests = counted.failing_tests;
            summed
        } else {
            counted
        }
    }

    /// One-line digest.
    pub fn digest(&self) -> String {
        let mut digest = format!(
            "{} passed; {} failed; {} ignored",
            self.passed, self.failed, self.ignored
        );
        if !self.failing_tests.is_empty() {
            digest.push_str(&format!("; failing: {}", self.failing_tests.join(", ")));
        }
        digest
    }
}

/// Extract a numeric count preceding a keyword from a test summary line.
///
/// E.g., from "10 passed; 0 failed" extract 10 for keyword "passed".
fn extract_count(line: &str, keyword: &str) -> Option<u32> {
    line.split(';')
        .map(str::trim)
        .filter(|part| part.contains(keyword))
        .find_map(|part| part.split_whitespace().find_map(|w| w.parse::<u32>().ok()))
}

fn into_run(output: ProcessOutput, summary: Option<String>) -> OracleRun {
    OracleRun {
        success: output.success,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        summary,
    }
}

/// Workspace-wide compile-check and test oracle.
pub struct CargoBuildOracle {
    check: CommandSpec,
    test: CommandSpec,
}

impl CargoBuildOracle {
    /// Create an oracle from explicit commands.
    pub fn new(check: CommandSpec, test: CommandSpec) -> Self {
        Self { check, test }
    }

    /// Build from configuration, running in `workspace_dir`.
    pub fn from_config(config: &ValidationConfig, workspace_dir: impl Into<PathBuf>) -> Self {
        let workspace_dir = workspace_dir.into();
        Self::new(
            CommandSpec::new(
                config.check_program.clone(),
                config.check_args.clone(),
                workspace_dir.clone(),
                config.check_timeout_secs,
            ),
            CommandSpec::new(
                config.test_program.clone(),
                config.test_args.clone(),
                workspace_dir,
                config.test_timeout_secs,
            ),
        )
    }
}

#[async_trait]
impl BuildOracle for CargoBuildOracle {
    #[instrument(skip(self), fields(command = %self.check.display()))]
    async fn check(&self) -> PipelineResult<OracleRun> {
        process::ensure_dir(&self.check.cwd, &self.check.tool_name())?;
        let output = process::run(&self.check).await?;

        let summary = if output.success {
            None
        } else {
            Some(BuildSummary::parse(&output.stderr).digest())
        };

        info!(success = output.success, summary = ?summary, "Compilation check complete");
        Ok(into_run(output, summary))
    }

    #[instrument(skip(self), fields(command = %self.test.display()))]
    async fn test(&self) -> PipelineResult<OracleRun> {
        process::ensure_dir(&self.test.cwd, &self.test.tool_name())?;
        let output = process::run(&self.test).await?;

        let results = TestSummary::parse(&output.stdout, &output.stderr);
        info!(
            success = output.success,
            passed = results.passed,
            failed = results.failed,
            ignored = results.ignored,
            "Test suite complete"
        );

        Ok(into_run(output, Some(results.digest())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_empty_output() {
        let summary = BuildSummary::parse("");
        assert_eq!(summary.error_count, 0);
        assert!(summary.errors.is_empty());
        assert_eq!(summary.digest(), "compilation failed");
    }

    #[test]
    fn parse_errors_with_summary_line() {
        let stderr = r#"error[E0308]: mismatched types
  --> src/main.rs:5:14
   |
5  |     let x: i32 = "hello";
   |            ---   ^^^^^^^ expected `i32`, found `&str`

error: aborting due to 1 previous error"#;

        let summary = BuildSummary::parse(stderr);
        assert_eq!(summary.error_count, 1);
        assert!(summary.digest().starts_with("1 compile error(s); first: error[E0308]"));
    }

    #[test]
    fn parse_errors_multiple_errors() {
        let stderr = "error[E0308]: mismatched types\nerror[E0425]: cannot find value `x` in this scope\nerror: aborting due to 2 previous errors";
        let summary = BuildSummary::parse(stderr);
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.errors.len(), 2);
    }

    #[test]
    fn parse_errors_cargo_could_not_compile_line_is_a_total() {
        let stderr = "\
error[E0308]: mismatched types
error[E0425]: cannot find value `x` in this scope
error: could not compile `covboost` (lib test) due to 2 previous errors; 1 warning emitted";
        let summary = BuildSummary::parse(stderr);
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.errors.len(), 2);
        assert!(summary.digest().starts_with("2 compile error(s); first: error[E0308]"));
    }

    #[test]
    fn parse_errors_without_total_counts_error_lines() {
        let stderr = "error[E0433]: failed to resolve\nerror: could not compile `x`";
        let summary = BuildSummary::parse(stderr);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.errors, vec!["error[E0433]: failed to resolve"]);
    }

    #[test]
    fn parse_test_output_sums_per_binary_results() {
        let stdout = "\
running 2 tests
test a::works ... ok
test a::breaks ... FAILED
test result: FAILED. 1 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out

running 3 tests
test b::one ... ok
test b::two ... ok
test b::slow ... ignored
test result: ok. 2 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out
";
        let summary = TestSummary::parse(stdout, "");
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.failing_tests, vec!["a::breaks"]);
        assert_eq!(
            summary.digest(),
            "3 passed; 1 failed; 1 ignored; failing: a::breaks"
        );
    }

    #[test]
    fn parse_test_output_without_summary_counts_lines() {
        let stdout = "test x ... ok\ntest y ... FAILED\n";
        let summary = TestSummary::parse(stdout, "");
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn extract_count_finds_keyword() {
        let line = "test result: ok. 10 passed; 0 failed; 2 ignored";
        assert_eq!(extract_count(line, "passed"), Some(10));
        assert_eq!(extract_count(line, "ignored"), Some(2));
        assert_eq!(extract_count(line, "measured"), None);
    }

    #[test]
    fn from_config_uses_configured_commands() {
        let oracle = CargoBuildOracle::from_config(&ValidationConfig::default(), "/work");
        assert_eq!(oracle.check.display(), "cargo check --workspace");
        assert_eq!(oracle.check.timeout_secs, 300);
        assert_eq!(oracle.test.timeout_secs, 600);
        assert_eq!(oracle.test.cwd, PathBuf::from("/work"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_check_is_a_failed_run_not_an_error() {
        let spec = |script: &str| {
            CommandSpec::new(
                "sh",
                vec!["-c".to_string(), script.to_string()],
                std::env::temp_dir(),
                10,
            )
        };
        let oracle = CargoBuildOracle::new(
            spec("echo 'error[E0425]: cannot find value' >&2; exit 101"),
            spec("echo 'test result: ok. 4 passed; 0 failed; 0 ignored'"),
        );

        let check = oracle.check().await.unwrap();
        assert!(!check.success);
        assert_eq!(check.exit_code, Some(101));
        assert!(check.diagnostics().contains("E0425"));

        let test = oracle.test().await.unwrap();
        assert!(test.success);
        assert_eq!(test.summary.as_deref(), Some("4 passed; 0 failed; 0 ignored"));
    }
}
