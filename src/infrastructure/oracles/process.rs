//! Bounded external-process execution shared by the oracles.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::infrastructure::logging::scrub_secrets;

/// A program invocation with its time limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: PathBuf,
    /// Wall-clock limit in seconds.
    pub timeout_secs: u64,
}

impl CommandSpec {
    /// Create a spec.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        cwd: impl Into<PathBuf>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
            timeout_secs,
        }
    }

    /// `program arg1 arg2 ...`, for messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Short tool label (`cargo check`, `cargo llvm-cov`).
    pub fn tool_name(&self) -> String {
        match self.args.first() {
            Some(sub) if !sub.starts_with('-') => format!("{} {sub}", self.program),
            _ => self.program.clone(),
        }
    }
}

/// Captured output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit status was zero.
    pub success: bool,
    /// Exit code, `None` when killed by a signal.
    pub exit_code: Option<i32>,
    /// Standard output (lossy UTF-8).
    pub stdout: String,
    /// Standard error (lossy UTF-8, secrets scrubbed).
    pub stderr: String,
}

/// Run `spec` to completion or until its timeout.
///
/// The child is killed when the timeout fires. Spawn failures become
/// [`PipelineError::ToolInvocation`]; timeouts become
/// [`PipelineError::ToolTimeout`]. A non-zero exit is *not* an error here.
pub async fn run(spec: &CommandSpec) -> PipelineResult<ProcessOutput> {
    tracing::debug!(command = %spec.display(), cwd = %spec.cwd.display(), "Spawning process");

    let child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            tracing::error!(command = %spec.display(), error = %e, "Failed to spawn process");
            PipelineError::tool(spec.tool_name(), format!("failed to spawn `{}`: {e}", spec.display()))
        })?;

    let limit = Duration::from_secs(spec.timeout_secs);
    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(command = %spec.display(), timeout_secs = spec.timeout_secs, "Process timed out");
            return Err(PipelineError::ToolTimeout {
                tool: spec.tool_name(),
                timeout_secs: spec.timeout_secs,
            });
        }
    };

    Ok(ProcessOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: scrub_secrets(&String::from_utf8_lossy(&output.stderr)),
    })
}

/// Whether `dir` exists; oracles check this before spawning.
pub fn ensure_dir(dir: &Path, tool: &str) -> PipelineResult<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(PipelineError::tool(
            tool,
            format!("working directory {} does not exist", dir.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, timeout_secs: u64) -> CommandSpec {
        CommandSpec::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            std::env::temp_dir(),
            timeout_secs,
        )
    }

    #[test]
    fn tool_name_uses_subcommand() {
        let spec = CommandSpec::new("cargo", vec!["check".into(), "--workspace".into()], ".", 1);
        assert_eq!(spec.tool_name(), "cargo check");
        assert_eq!(spec.display(), "cargo check --workspace");

        let spec = CommandSpec::new("make", vec!["--silent".into()], ".", 1);
        assert_eq!(spec.tool_name(), "make");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_streams_and_exit_code() {
        let output = run(&sh("echo out; echo err >&2; exit 3", 10)).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_is_reported() {
        let err = run(&sh("sleep 5", 1)).await.unwrap_err();
        assert!(matches!(err, PipelineError::ToolTimeout { timeout_secs: 1, .. }));
    }

    #[tokio::test]
    async fn missing_program_is_tool_invocation_error() {
        let spec = CommandSpec::new("covboost-no-such-binary", vec![], std::env::temp_dir(), 5);
        let err = run(&spec).await.unwrap_err();
        assert!(matches!(err, PipelineError::ToolInvocation { .. }));
    }

    #[test]
    fn ensure_dir_rejects_missing_directory() {
        assert!(ensure_dir(&std::env::temp_dir(), "cargo").is_ok());
        assert!(ensure_dir(Path::new("/definitely/not/a/dir"), "cargo").is_err());
    }
}
