//! External process oracles: coverage measurement, compile check, test run.

pub mod cargo;
pub mod llvm_cov;
pub mod process;

pub use cargo::{BuildSummary, CargoBuildOracle, TestSummary};
pub use llvm_cov::LlvmCovOracle;
pub use process::CommandSpec;
