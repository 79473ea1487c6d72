//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports:
//! - Coverage, compile-check and test oracles (external processes)
//! - Chat-completions model client (HTTP)
//! - Stage stores (filesystem and in-memory)
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;
pub mod oracles;
pub mod state;
