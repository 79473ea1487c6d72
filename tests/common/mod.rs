//! Common test utilities for integration tests
//!
//! Scripted fakes for the three external seams plus small fixture helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use covboost::domain::errors::{PipelineError, PipelineResult};
use covboost::domain::models::{
    CoverageExport, CoverageReport, FileCoverage, GenerationRequest, GenerationResponse,
};
use covboost::domain::ports::{BuildOracle, CoverageOracle, ModelClient, OracleRun};
use covboost::infrastructure::state::InMemoryStageStore;
use covboost::services::StageContext;

/// Build a coverage report from `(path, covered, total)` triples.
pub fn report(files: &[(&str, u64, u64)]) -> CoverageReport {
    CoverageReport {
        data: vec![CoverageExport {
            files: files
                .iter()
                .map(|(path, covered, total)| FileCoverage::with_lines(*path, *covered, *total))
                .collect(),
        }],
        kind: None,
        version: None,
    }
}

/// Coverage oracle returning scripted reports in order; the last one repeats.
pub struct ScriptedCoverage {
    reports: Mutex<VecDeque<CoverageReport>>,
    calls: AtomicUsize,
}

impl ScriptedCoverage {
    pub fn new(reports: Vec<CoverageReport>) -> Arc<Self> {
        Arc::new(Self {
            reports: Mutex::new(reports.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoverageOracle for ScriptedCoverage {
    async fn measure(&self) -> PipelineResult<CoverageReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut reports = self.reports.lock().unwrap();
        let report = if reports.len() > 1 {
            reports.pop_front()
        } else {
            reports.front().cloned()
        };
        report.ok_or_else(|| PipelineError::ToolInvocation {
            tool: "cargo llvm-cov".to_string(),
            exit_code: Some(1),
            diagnostics: "no scripted report".to_string(),
        })
    }
}

/// Build oracle whose compile checks follow a script; tests always pass.
///
/// Once the script is exhausted every further check passes.
pub struct ScriptedBuild {
    checks: Mutex<VecDeque<bool>>,
    check_calls: AtomicUsize,
    test_calls: AtomicUsize,
}

impl ScriptedBuild {
    pub fn new(checks: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            checks: Mutex::new(checks.iter().copied().collect()),
            check_calls: AtomicUsize::new(0),
            test_calls: AtomicUsize::new(0),
        })
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn test_calls(&self) -> usize {
        self.test_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildOracle for ScriptedBuild {
    async fn check(&self) -> PipelineResult<OracleRun> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let pass = self.checks.lock().unwrap().pop_front().unwrap_or(true);
        Ok(if pass {
            OracleRun::passed()
        } else {
            OracleRun::failed("error[E0425]: cannot find value `x` in this scope")
        })
    }

    async fn test(&self) -> PipelineResult<OracleRun> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        Ok(OracleRun::passed())
    }
}

/// Model client returning the same fenced response every time.
pub struct CannedModel {
    content: String,
    calls: AtomicUsize,
}

impl CannedModel {
    pub fn new(test_code: &str) -> Arc<Self> {
        Arc::new(Self {
            content: format!("Here are the tests:\n```rust\n{test_code}\n```\nDone."),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for CannedModel {
    fn model_name(&self) -> &str {
        "canned-model"
    }

    async fn complete(&self, request: &GenerationRequest) -> PipelineResult<GenerationResponse> {
        assert!(request.prompt.contains(&request.file_text));
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GenerationResponse {
            content: self.content.clone(),
            model: None,
        })
    }
}

/// Model client that always fails authentication.
pub struct UnauthorizedModel;

#[async_trait]
impl ModelClient for UnauthorizedModel {
    fn model_name(&self) -> &str {
        "unauthorized"
    }

    async fn complete(&self, _request: &GenerationRequest) -> PipelineResult<GenerationResponse> {
        Err(PipelineError::ServiceAuth(
            "GITHUB_TOKEN environment variable is not set".to_string(),
        ))
    }
}

/// Temporary workspace with the given files written under it.
pub fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (path, contents) in files {
        write_file(dir.path(), path, contents);
    }
    dir
}

pub fn write_file(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(full, contents).unwrap();
}

/// Stage context over a fresh in-memory store.
pub fn memory_context(workspace: &Path) -> (StageContext, Arc<InMemoryStageStore>) {
    let store = Arc::new(InMemoryStageStore::new());
    (StageContext::new(store.clone(), workspace), store)
}
