//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces infrastructure adapters must implement:
//! - CoverageOracle: produces a structured coverage report
//! - ModelClient: turns a generation request into candidate text
//! - BuildOracle: compile-check and test-execution pass/fail oracle
//! - StageStore: persistence of intermediate stage results
//!
//! The services only depend on these traits, so a run can be wired to real
//! processes and HTTP or to in-memory fakes for testing.

pub mod build_oracle;
pub mod coverage_oracle;
pub mod model_client;
pub mod stage_store;

pub use build_oracle::{BuildOracle, OracleRun};
pub use coverage_oracle::CoverageOracle;
pub use model_client::ModelClient;
pub use stage_store::{StageArtifact, StageStore};
