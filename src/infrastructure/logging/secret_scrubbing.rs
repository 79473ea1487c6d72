use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static DEFAULT_SCRUBBER: LazyLock<SecretScrubber> = LazyLock::new(SecretScrubber::new);

/// Redacts credentials from text before it is logged or shown.
///
/// Model-service error bodies and oracle output can echo request headers or
/// environment dumps, so both pass through here.
#[derive(Clone)]
pub struct SecretScrubber {
    patterns: Vec<(Regex, &'static str)>,
}

impl SecretScrubber {
    /// Create a scrubber with the built-in patterns.
    pub fn new() -> Self {
        let sources: [(&str, &'static str); 4] = [
            // Bearer tokens in Authorization headers
            (r"Bearer\s+[a-zA-Z0-9\-_\.]+", "Bearer [TOKEN_REDACTED]"),
            // GitHub fine-grained personal access tokens
            (r"github_pat_[a-zA-Z0-9_]{20,}", "[TOKEN_REDACTED]"),
            // GitHub classic, OAuth, app and refresh tokens
            (r"gh[pousr]_[a-zA-Z0-9]{20,}", "[TOKEN_REDACTED]"),
            // key=value / "key": "value" secrets
            (
                r#"(?i)["']?(?:api_key|apikey|token|secret)["']?\s*[:=]\s*["']?[a-zA-Z0-9\-_\.]{20,}["']?"#,
                "[REDACTED]",
            ),
        ];

        let patterns = sources
            .into_iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|regex| (regex, replacement))
            })
            .collect();

        Self { patterns }
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        self.patterns
            .iter()
            .fold(message.to_string(), |text, (regex, replacement)| {
                regex.replace_all(&text, *replacement).into_owned()
            })
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}

/// Scrub `message` with the shared default scrubber.
pub fn scrub_secrets(message: &str) -> String {
    DEFAULT_SCRUBBER.scrub_message(message)
}
