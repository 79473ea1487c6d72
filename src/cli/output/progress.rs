//! Terminal rendering of the progress narrative.
//!
//! Stage headings, ✅/❌ markers and raw oracle diagnostics are written line
//! by line. On an interactive terminal a spinner shows the step currently
//! running; printed lines go above it.

use std::time::Duration;

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use crate::services::progress::{ProgressEvent, ProgressSink};

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const RULE_WIDTH: usize = 80;

/// Create a spinner for indeterminate operations
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(spinner_style.tick_chars(SPINNER_CHARS));
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Progress sink writing to the terminal.
pub struct ConsoleProgress {
    term: Term,
    spinner: Option<ProgressBar>,
}

impl ConsoleProgress {
    /// Narrative on stdout, with a spinner when stdout is a terminal.
    ///
    /// In JSON mode the narrative moves to stderr so stdout carries only the
    /// result document.
    pub fn new(json_mode: bool) -> Self {
        let term = if json_mode { Term::stderr() } else { Term::stdout() };
        let spinner = (!json_mode && term.is_term()).then(create_spinner);
        Self { term, spinner }
    }

    fn line(&self, text: &str) {
        match &self.spinner {
            Some(spinner) => spinner.println(text),
            None => {
                let _ = self.term.write_line(text);
            }
        }
    }

    /// Remove the spinner.
    pub fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Stage(title) => {
                let rule = "=".repeat(RULE_WIDTH);
                self.line("");
                self.line(&rule);
                self.line(&style(title).bold().to_string());
                self.line(&rule);
            }
            ProgressEvent::Step(message) => {
                if let Some(spinner) = &self.spinner {
                    spinner.set_message(message.clone());
                }
                self.line(&message);
            }
            ProgressEvent::Success(message) => {
                self.line(&format!("✅ {}", style(message).green()));
            }
            ProgressEvent::Failure(message) => {
                self.line(&format!("❌ {}", style(message).red()));
            }
            ProgressEvent::Warning(message) => {
                self.line(&format!("⚠️  {}", style(message).yellow()));
            }
            ProgressEvent::Detail(text) => {
                for detail in text.lines() {
                    self.line(&format!("    {}", style(detail).dim()));
                }
            }
        }
    }
}
