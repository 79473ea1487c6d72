//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON console output on stderr
//! - Optional daily-rolling JSON log files
//! - Secret scrubbing for error bodies and tool output

pub mod logger;
pub mod secret_scrubbing;

pub use logger::{verbosity_level, LoggerImpl};
pub use secret_scrubbing::{scrub_secrets, SecretScrubber};
