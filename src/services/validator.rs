//! Candidate validation: stage, compile-check, test, then commit or roll back.
//!
//! A single attempt walks `Init -> Staged -> Checked -> Tested` and ends in
//! exactly one of `Committed` or `RolledBack`. Whatever happens after staging
//! (oracle failure, timeout, spawn error), the working file is left either as
//! the full candidate or byte-identical to the original. A crash between the
//! backup and the restore is not covered: those are two separate filesystem
//! operations.
//!
//! [`ValidationDriver`] wraps attempts in a loop bounded by
//! [`MAX_VALIDATION_ATTEMPTS`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::{RetryStrategy, MAX_VALIDATION_ATTEMPTS};
use crate::domain::ports::{BuildOracle, OracleRun};
use crate::services::progress::ProgressSink;

/// Pass/fail verdict of one oracle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Oracle reported success.
    Pass,
    /// Oracle reported failure, errored or timed out.
    Fail,
}

/// States of a single validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Nothing touched yet.
    Init,
    /// Backup taken, candidate written over the working file.
    Staged,
    /// Compile check finished.
    Checked(Verdict),
    /// Test run finished.
    Tested(Verdict),
    /// Candidate kept, backup removed.
    Committed,
    /// Original restored from backup.
    RolledBack,
}

/// Which transition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedTransition {
    /// `Staged -> Checked`.
    Check,
    /// `Checked -> Tested`.
    Test,
}

impl std::fmt::Display for FailedTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Check => write!(f, "compile check"),
            Self::Test => write!(f, "test run"),
        }
    }
}

/// Terminal result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Both oracles passed and the candidate is in place.
    Committed,
    /// An oracle failed; the original is back in place.
    RolledBack {
        /// Failing transition.
        failed_at: FailedTransition,
        /// Short reason (oracle summary or error message).
        reason: String,
        /// Raw oracle output, if any.
        diagnostics: String,
    },
}

/// Full record of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    /// 1-based attempt number.
    pub attempt: u32,
    /// States visited, in order.
    pub states: Vec<AttemptState>,
    /// How it ended.
    pub outcome: AttemptOutcome,
}

impl AttemptReport {
    /// Whether the candidate was committed.
    pub const fn committed(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Committed)
    }
}

/// Backup/restore guard around a staged working file.
///
/// Dropping an unsettled guard restores the original, so an early return or a
/// panic between staging and settling still rolls back.
struct StagedFile {
    target: PathBuf,
    backup: PathBuf,
    settled: bool,
}

impl StagedFile {
    fn backup_path(target: &Path) -> PathBuf {
        let mut name = target.as_os_str().to_owned();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// Snapshot `target` and overwrite it with `candidate`.
    ///
    /// A failed snapshot aborts before anything is mutated.
    fn stage(target: &Path, candidate: &str) -> PipelineResult<Self> {
        let backup = Self::backup_path(target);
        std::fs::copy(target, &backup).map_err(|err| PipelineError::BackupFailed {
            path: target.display().to_string(),
            reason: err.to_string(),
        })?;

        let staged = Self {
            target: target.to_path_buf(),
            backup,
            settled: false,
        };

        // Writing in place keeps the file's permissions and identity. On
        // failure the guard's drop puts the original back.
        std::fs::write(&staged.target, candidate)?;
        Ok(staged)
    }

    /// Keep the candidate. Removing the backup is advisory.
    fn commit(mut self) {
        self.settled = true;
        if let Err(err) = std::fs::remove_file(&self.backup) {
            warn!(backup = %self.backup.display(), error = %err, "Failed to remove backup");
        }
    }

    /// Restore the original.
    fn rollback(mut self) -> PipelineResult<()> {
        self.settled = true;
        std::fs::copy(&self.backup, &self.target)?;
        if let Err(err) = std::fs::remove_file(&self.backup) {
            warn!(backup = %self.backup.display(), error = %err, "Failed to remove backup");
        }
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match std::fs::copy(&self.backup, &self.target) {
            Ok(_) => {
                let _ = std::fs::remove_file(&self.backup);
            }
            Err(err) => error!(
                target = %self.target.display(),
                backup = %self.backup.display(),
                error = %err,
                "Failed to restore original while unwinding; backup left in place"
            ),
        }
    }
}

/// Runs one validation attempt against a build oracle.
pub struct TestValidator {
    oracle: Arc<dyn BuildOracle>,
}

impl TestValidator {
    /// Create a validator.
    pub fn new(oracle: Arc<dyn BuildOracle>) -> Self {
        Self { oracle }
    }

    /// Map an oracle call into a verdict plus failure details.
    fn judge(result: PipelineResult<OracleRun>) -> (Verdict, Option<(String, String)>) {
        match result {
            Ok(run) if run.success => (Verdict::Pass, None),
            Ok(run) => {
                let reason = run
                    .summary
                    .clone()
                    .unwrap_or_else(|| format!("exit code {:?}", run.exit_code));
                (Verdict::Fail, Some((reason, run.diagnostics())))
            }
            Err(err) => (Verdict::Fail, Some((err.to_string(), String::new()))),
        }
    }

    /// Stage `candidate` over `target`, run the oracles, commit or roll back.
    ///
    /// `Err` is reserved for failures that break the all-or-nothing guarantee's
    /// preconditions: the backup could not be taken, or the restore failed.
    #[instrument(skip(self, candidate, progress), fields(target = %target.display()))]
    pub async fn attempt(
        &self,
        attempt: u32,
        target: &Path,
        candidate: &str,
        progress: &dyn ProgressSink,
    ) -> PipelineResult<AttemptReport> {
        let mut states = vec![AttemptState::Init];

        let staged = StagedFile::stage(target, candidate)?;
        states.push(AttemptState::Staged);
        progress.step(&format!("Testing file: {}", target.display()));

        progress.step("Running compile check...");
        let (verdict, failure) = Self::judge(self.oracle.check().await);
        states.push(AttemptState::Checked(verdict));

        let failure = match failure {
            Some((reason, diagnostics)) => Some((FailedTransition::Check, reason, diagnostics)),
            None => {
                progress.success("Compilation successful!");
                progress.step("Running tests...");
                let (verdict, failure) = Self::judge(self.oracle.test().await);
                states.push(AttemptState::Tested(verdict));
                failure.map(|(reason, diagnostics)| (FailedTransition::Test, reason, diagnostics))
            }
        };

        let outcome = match failure {
            None => {
                staged.commit();
                states.push(AttemptState::Committed);
                progress.success("All tests passed!");
                info!(attempt, "Candidate committed");
                AttemptOutcome::Committed
            }
            Some((failed_at, reason, diagnostics)) => {
                progress.failure(&format!("{failed_at} failed: {reason}"));
                progress.detail(&diagnostics);
                staged.rollback()?;
                states.push(AttemptState::RolledBack);
                progress.step("Restored original file from backup");
                warn!(attempt, %failed_at, %reason, "Candidate rolled back");
                AttemptOutcome::RolledBack {
                    failed_at,
                    reason,
                    diagnostics,
                }
            }
        };

        Ok(AttemptReport {
            attempt,
            states,
            outcome,
        })
    }
}

/// Supplies candidate content to the driver.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// The candidate for the first attempt.
    async fn initial(&self) -> PipelineResult<String>;

    /// A fresh candidate before retry number `attempt`.
    async fn regenerate(&self, attempt: u32) -> PipelineResult<String>;
}

/// A candidate that never changes.
pub struct FixedCandidate(pub String);

#[async_trait]
impl CandidateSource for FixedCandidate {
    async fn initial(&self) -> PipelineResult<String> {
        Ok(self.0.clone())
    }

    async fn regenerate(&self, _attempt: u32) -> PipelineResult<String> {
        Ok(self.0.clone())
    }
}

/// Aggregate result of the retry loop.
#[derive(Debug)]
pub struct ValidationReport {
    /// Per-attempt records, in order.
    pub attempts: Vec<AttemptReport>,
    /// A non-retryable error that stopped the loop early.
    pub error: Option<PipelineError>,
}

impl ValidationReport {
    /// Whether the last attempt committed.
    pub fn success(&self) -> bool {
        self.error.is_none() && self.attempts.last().is_some_and(AttemptReport::committed)
    }

    /// Number of attempts performed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn attempts_made(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Convert into `Ok` on commit, otherwise the stopping error or a
    /// [`PipelineError::ValidationFailure`].
    pub fn into_result(mut self) -> PipelineResult<Self> {
        if self.success() {
            return Ok(self);
        }
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        let reason = self
            .attempts
            .last()
            .map(|a| match &a.outcome {
                AttemptOutcome::RolledBack { failed_at, reason, .. } => {
                    format!("{failed_at} failed: {reason}")
                }
                AttemptOutcome::Committed => String::new(),
            })
            .unwrap_or_else(|| "no attempt was made".to_string());
        Err(PipelineError::ValidationFailure {
            attempts: self.attempts_made(),
            reason,
        })
    }
}

/// Bounded retry loop around [`TestValidator::attempt`].
pub struct ValidationDriver {
    validator: TestValidator,
    max_attempts: u32,
    strategy: RetryStrategy,
}

impl ValidationDriver {
    /// Create a driver. `max_attempts` is clamped to `1..=MAX_VALIDATION_ATTEMPTS`.
    pub fn new(validator: TestValidator, max_attempts: u32, strategy: RetryStrategy) -> Self {
        Self {
            validator,
            max_attempts: max_attempts.clamp(1, MAX_VALIDATION_ATTEMPTS),
            strategy,
        }
    }

    /// Effective attempt bound.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Validate candidates for `target` until one commits or attempts run out.
    pub async fn run(
        &self,
        target: &Path,
        source: &dyn CandidateSource,
        progress: &dyn ProgressSink,
    ) -> ValidationReport {
        let mut report = ValidationReport {
            attempts: Vec::new(),
            error: None,
        };

        let mut candidate = match source.initial().await {
            Ok(candidate) => candidate,
            Err(err) => {
                report.error = Some(err);
                return report;
            }
        };

        for attempt in 1..=self.max_attempts {
            progress.stage(&format!("Validation Attempt {attempt}/{}", self.max_attempts));

            if attempt > 1 && self.strategy == RetryStrategy::Regenerate {
                progress.step("Regenerating candidate before retry...");
                match source.regenerate(attempt).await {
                    Ok(fresh) => candidate = fresh,
                    Err(err) => {
                        progress.failure(&format!("Regeneration failed: {err}"));
                        report.error = Some(err);
                        return report;
                    }
                }
            }

            match self.validator.attempt(attempt, target, &candidate, progress).await {
                Ok(attempt_report) => {
                    let committed = attempt_report.committed();
                    report.attempts.push(attempt_report);
                    if committed {
                        return report;
                    }
                    progress.failure(&format!("Validation attempt {attempt} failed"));
                }
                Err(err) => {
                    progress.failure(&format!("Validation aborted: {err}"));
                    report.error = Some(err);
                    return report;
                }
            }
        }

        report
    }
}
