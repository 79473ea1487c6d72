//! Test generation: prompt construction, model call, code extraction, splice.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::{ContextFile, FileStats, GenerationRequest, SpliceResult};
use crate::domain::ports::ModelClient;
use crate::services::splice::splice;

/// System role instruction sent with every request.
pub const SYSTEM_PROMPT: &str =
    "You are an expert Rust developer who writes high-quality, comprehensive unit tests.";

/// Build the generation request for one file.
///
/// Deterministic: the same inputs always produce the same prompt. Sibling files
/// in `context` are appended after the target file, in the given order.
pub fn build_request(
    file_path: &str,
    file_text: &str,
    stats: &FileStats,
    context: &[ContextFile],
) -> GenerationRequest {
    let mut module_context = String::new();
    if !context.is_empty() {
        module_context.push_str("\n\nHere are other files in the same module for context:\n\n");
        for file in context {
            module_context.push_str(&format!(
                "File: {}\n```rust\n{}\n```\n\n",
                file.name, file.content
            ));
        }
    }

    let prompt = format!(
        "You are an expert Rust developer tasked with writing comprehensive unit tests.

I have a Rust source file that currently has {coverage:.2}% test coverage ({covered}/{total} lines covered).

Target file path: {file_path}

Here is the target file content:

```rust
{file_text}
```{module_context}

Please generate comprehensive unit tests for the TARGET FILE following these requirements:

1. Focus on testing the most critical and complex functions that are currently uncovered in the TARGET FILE
2. Write tests that follow Rust best practices and conventions
3. Include tests for:
   - Normal/happy path cases
   - Edge cases and boundary conditions
   - Error handling paths
   - Different input variations
4. Use the existing test module structure if present, or create a new #[cfg(test)] module
5. Make sure tests are self-contained and don't require external dependencies when possible
6. Follow the coding style and patterns already present in the file
7. Add descriptive test names that clearly indicate what is being tested
8. Use the context from other module files to understand types, traits, and dependencies

Please provide ONLY the test code that should be added to the existing #[cfg(test)] mod tests section of the TARGET FILE, or a complete new test module if none exists. Do not include the entire file, just the test code to be added.

Format your response as:
```rust
// Your test code here
```
",
        coverage = stats.coverage,
        covered = stats.covered,
        total = stats.total,
    );

    GenerationRequest {
        file_path: file_path.to_string(),
        file_text: file_text.to_string(),
        stats: stats.clone(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        prompt,
    }
}

/// Pull candidate code out of a model response.
///
/// Returns the trimmed text between the first fence tagged `language` and the
/// next fence. Without such a fence, when the closing fence follows the tag
/// directly, or when the block is unclosed, the whole response is returned
/// unchanged. A block holding only whitespace yields an empty string.
pub fn extract_code(response: &str, language: &str) -> String {
    let opening = format!("```{language}");
    let Some(fence_at) = response.find(&opening) else {
        return response.to_string();
    };

    let start = fence_at + opening.len();
    match response[start..].find("```") {
        Some(end) if end > 0 => response[start..start + end].trim().to_string(),
        _ => response.to_string(),
    }
}

/// Collect sibling source files of `target` for prompt context.
///
/// Skips the target itself, files with another extension, and any file whose
/// name mentions `test`. Unreadable files are skipped with a warning.
pub fn collect_module_files(target: &Path, extension: &str) -> PipelineResult<Vec<ContextFile>> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    let target_name = target.file_name();

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.file_name() == target_name {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.extension().and_then(|e| e.to_str()) != Some(extension) || name.contains("test") {
            continue;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => files.push(ContextFile {
                name: name.to_string(),
                content,
            }),
            Err(err) => warn!(path = %path.display(), error = %err, "Skipping unreadable module file"),
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// A generated candidate ready to be staged.
#[derive(Debug, Clone)]
pub struct GeneratedCandidate {
    /// Extracted test code.
    pub tests: String,
    /// Target file content with the tests spliced in.
    pub splice: SpliceResult,
    /// Model that produced it.
    pub model: String,
}

/// Produces candidate files for a target by asking the model for tests.
pub struct TestGenerator {
    client: Arc<dyn ModelClient>,
    language: String,
    include_module_context: bool,
}

impl std::fmt::Debug for TestGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestGenerator")
            .field("language", &self.language)
            .field("include_module_context", &self.include_module_context)
            .finish_non_exhaustive()
    }
}

impl TestGenerator {
    /// Create a generator.
    pub fn new(client: Arc<dyn ModelClient>, language: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
            include_module_context: true,
        }
    }

    /// Toggle sibling-file context in the prompt.
    #[must_use]
    pub fn with_module_context(mut self, enabled: bool) -> Self {
        self.include_module_context = enabled;
        self
    }

    /// Name of the model behind this generator.
    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Generate a candidate for `file_path` using its current `stats`.
    #[instrument(skip(self, stats), fields(model = %self.client.model_name()))]
    pub async fn generate(&self, file_path: &str, stats: &FileStats) -> PipelineResult<GeneratedCandidate> {
        let file_text = std::fs::read_to_string(file_path).map_err(|err| {
            PipelineError::Io(std::io::Error::new(
                err.kind(),
                format!("failed to read {file_path}: {err}"),
            ))
        })?;

        let context = if self.include_module_context {
            collect_module_files(Path::new(file_path), &self.language_extension())?
        } else {
            Vec::new()
        };
        debug!(context_files = context.len(), "Collected module context");

        let request = build_request(file_path, &file_text, stats, &context);
        let response = self.client.complete(&request).await?;
        let tests = extract_code(&response.content, &self.language);
        let splice = splice(&file_text, &tests);

        info!(
            file = file_path,
            generated_lines = tests.lines().count(),
            placement = ?splice.placement,
            "Generated candidate"
        );

        Ok(GeneratedCandidate {
            tests,
            splice,
            model: response
                .model
                .unwrap_or_else(|| self.client.model_name().to_string()),
        })
    }

    fn language_extension(&self) -> String {
        match self.language.as_str() {
            "rust" => "rs".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FileCoverage, GenerationResponse, SplicePlacement};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn stats() -> FileStats {
        FileStats::from_entry(&FileCoverage::with_lines("src/lib.rs", 3, 12)).unwrap()
    }

    #[test]
    fn extracts_fenced_block() {
        let response = "Here:\n```rust\nTEST_CODE\n```\nDone.";
        assert_eq!(extract_code(response, "rust"), "TEST_CODE");
    }

    #[test]
    fn returns_unfenced_response_unchanged() {
        let response = "#[test]\nfn works() {}\n";
        assert_eq!(extract_code(response, "rust"), response);
    }

    #[test]
    fn extract_takes_first_block_only() {
        let response = "```rust\nfirst\n```\ntext\n```rust\nsecond\n```";
        assert_eq!(extract_code(response, "rust"), "first");
    }

    #[test]
    fn extract_ignores_other_languages() {
        let response = "```python\nprint(1)\n```";
        assert_eq!(extract_code(response, "rust"), response);
    }

    #[test]
    fn extract_unclosed_fence_returns_full_text() {
        let response = "```rust\nfn half() {";
        assert_eq!(extract_code(response, "rust"), response);
    }

    #[test]
    fn extract_adjacent_fences_return_full_text() {
        let response = "```rust```";
        assert_eq!(extract_code(response, "rust"), response);
    }

    #[test]
    fn extract_whitespace_only_block_is_empty() {
        assert_eq!(extract_code("```rust\n```", "rust"), "");
    }

    #[test]
    fn request_embeds_path_stats_and_file_verbatim() {
        let text = "pub fn x() -> u8 { 7 }\n";
        let request = build_request("src/lib.rs", text, &stats(), &[]);

        assert_eq!(request.system_prompt, SYSTEM_PROMPT);
        assert!(request.prompt.contains("25.00% test coverage (3/12 lines covered)"));
        assert!(request.prompt.contains("Target file path: src/lib.rs"));
        assert!(request.prompt.contains(text));
        assert!(request.prompt.contains("Edge cases and boundary conditions"));
        assert!(request.prompt.contains("Error handling paths"));
        assert!(request.prompt.contains("Do not include the entire file"));
        assert!(!request.prompt.contains("other files in the same module"));
    }

    #[test]
    fn request_is_deterministic_and_includes_context() {
        let context = vec![ContextFile {
            name: "types.rs".to_string(),
            content: "pub struct T;".to_string(),
        }];
        let a = build_request("src/lib.rs", "x", &stats(), &context);
        let b = build_request("src/lib.rs", "x", &stats(), &context);
        assert_eq!(a, b);
        assert!(a.prompt.contains("File: types.rs\n```rust\npub struct T;\n```"));
    }

    #[test]
    fn collect_module_files_skips_target_tests_and_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "target").unwrap();
        std::fs::write(dir.path().join("b.rs"), "b").unwrap();
        std::fs::write(dir.path().join("a.rs"), "a").unwrap();
        std::fs::write(dir.path().join("lib_test.rs"), "t").unwrap();
        std::fs::write(dir.path().join("testing.rs"), "t").unwrap();
        std::fs::write(dir.path().join("notes.md"), "n").unwrap();

        let files = collect_module_files(&dir.path().join("lib.rs"), "rs").unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.rs", "b.rs"]);
    }

    struct CannedClient {
        reply: String,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl ModelClient for CannedClient {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &GenerationRequest) -> PipelineResult<GenerationResponse> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(GenerationResponse {
                content: self.reply.clone(),
                model: None,
            })
        }
    }

    #[tokio::test]
    async fn generate_splices_extracted_code_into_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("calc.rs");
        std::fs::write(&target, "pub fn two() -> u8 {\n    2\n}\n").unwrap();

        let client = Arc::new(CannedClient {
            reply: "Sure!\n```rust\n    #[test]\n    fn two_is_two() { assert_eq!(two(), 2); }\n```".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let generator = TestGenerator::new(client.clone(), "rust").with_module_context(false);

        let path = target.to_string_lossy().to_string();
        let candidate = generator.generate(&path, &stats()).await.unwrap();

        assert_eq!(candidate.model, "canned");
        assert_eq!(candidate.splice.placement, SplicePlacement::NewModule);
        assert!(candidate.splice.content.contains("fn two_is_two()"));
        assert!(candidate.splice.content.contains("mod tests {\n    use super::*;"));
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn generate_fails_for_missing_file() {
        let client = Arc::new(CannedClient {
            reply: String::new(),
            seen: Mutex::new(Vec::new()),
        });
        let generator = TestGenerator::new(client.clone(), "rust");
        let err = generator
            .generate("/definitely/not/here.rs", &stats())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(client.seen.lock().unwrap().is_empty());
    }
}
