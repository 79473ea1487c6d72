//! Test generation request/response types.

use serde::{Deserialize, Serialize};

use super::coverage::FileStats;

/// A sibling source file embedded in the prompt for context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    /// File name relative to the target's directory.
    pub name: String,
    /// Full file text.
    pub content: String,
}

/// Everything the model needs to produce tests for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Path of the target file.
    pub file_path: String,
    /// Full text of the target file.
    pub file_text: String,
    /// Current coverage of the target file.
    pub stats: FileStats,
    /// System role instruction.
    pub system_prompt: String,
    /// User role prompt (contains `file_text` verbatim).
    pub prompt: String,
}

/// Raw model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Content of the first choice's message.
    pub content: String,
    /// Model identifier echoed by the service, if any.
    #[serde(default)]
    pub model: Option<String>,
}

/// Where the generated code ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplicePlacement {
    /// Inserted before the closing line of an existing test module.
    ExistingModule {
        /// Zero-based line index of the closing line.
        line: usize,
    },
    /// Appended inside a freshly synthesized test module.
    NewModule,
    /// A marker was found but its block never closed; code appended bare.
    Unterminated,
}

/// Original file text with generated tests spliced in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceResult {
    /// The new file content.
    pub content: String,
    /// How the code was placed.
    pub placement: SplicePlacement,
}
