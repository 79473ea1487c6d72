//! Splicing generated tests into a source file.
//!
//! The test module boundary is found by counting braces line by line after the
//! `#[cfg(test)]` marker. Braces inside string literals, char literals or
//! comments are counted too; this is an accepted approximation that keeps
//! insertion behavior identical to the line-scanning heuristic, and any broken
//! result is caught by the validator's compile check.

use crate::domain::models::{SplicePlacement, SpliceResult};

/// Marker that opens a test module.
pub const TEST_MODULE_MARKER: &str = "#[cfg(test)]";

/// Find the line index before which generated code goes.
///
/// Lines containing the marker are not counted. The insertion point is the
/// first later line where the running balance is back to zero and the line
/// itself holds a closing brace.
fn find_insertion_line(lines: &[&str]) -> Option<usize> {
    let mut in_test_module = false;
    let mut balance: i64 = 0;

    for (index, line) in lines.iter().enumerate() {
        if line.contains(TEST_MODULE_MARKER) {
            in_test_module = true;
            continue;
        }

        if !in_test_module {
            continue;
        }

        #[allow(clippy::cast_possible_wrap)]
        {
            balance += line.matches('{').count() as i64;
            balance -= line.matches('}').count() as i64;
        }

        if balance == 0 && line.contains('}') {
            return Some(index);
        }
    }

    None
}

/// Wrap `generated` in a new test module appended to `original`.
fn append_new_module(original: &str, generated: &str) -> String {
    format!("{original}\n\n{TEST_MODULE_MARKER}\nmod tests {{\n    use super::*;\n\n{generated}\n}}\n")
}

/// Insert `generated` into `original`.
///
/// * Existing, balanced test module: a blank line plus the code go right before
///   the module's closing line.
/// * No marker: the code is appended inside a new module that imports the
///   parent scope.
/// * Marker whose block never closes: the code is appended bare at the end of
///   the file. The result does not compile; the validator rejects it.
pub fn splice(original: &str, generated: &str) -> SpliceResult {
    if !original.contains(TEST_MODULE_MARKER) {
        return SpliceResult {
            content: append_new_module(original, generated),
            placement: SplicePlacement::NewModule,
        };
    }

    let lines: Vec<&str> = original.split('\n').collect();
    match find_insertion_line(&lines) {
        Some(line) => {
            let mut spliced: Vec<&str> = Vec::with_capacity(lines.len() + 2);
            spliced.extend_from_slice(&lines[..line]);
            spliced.push("");
            spliced.push(generated);
            spliced.extend_from_slice(&lines[line..]);
            SpliceResult {
                content: spliced.join("\n"),
                placement: SplicePlacement::ExistingModule { line },
            }
        }
        None => SpliceResult {
            content: format!("{original}\n\n{generated}\n"),
            placement: SplicePlacement::Unterminated,
        },
    }
}
