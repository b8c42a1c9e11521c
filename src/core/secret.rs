//! Secret masking for error text sent to clients and written to logs.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Patterns for the provider keys this service handles, most specific first.
const SECRET_PATTERNS: &[(&str, &str)] = &[
    (r"sk-ant-[a-zA-Z0-9_-]{20,}", "[MASKED_ANTHROPIC_KEY]"),
    (r"sk-proj-[a-zA-Z0-9_-]{20,}", "[MASKED_OPENAI_KEY]"),
    (r"sk-[a-zA-Z0-9]{20,}", "[MASKED_API_KEY]"),
    (r"tvly-[a-zA-Z0-9_-]{16,}", "[MASKED_TAVILY_KEY]"),
    (r"(?i)bearer\s+[a-zA-Z0-9._-]+", "[MASKED_BEARER_TOKEN]"),
    (r"(?i)x-api-key:\s*[a-zA-Z0-9._-]+", "[MASKED_API_KEY_HEADER]"),
    (r"(?i)api_?key\s*[=:]\s*[a-zA-Z0-9_-]{16,}", "[MASKED_SECRET]"),
];

/// Compiled secret patterns.
pub struct SecretMasker {
    patterns: Vec<(Regex, &'static str)>,
}

impl Default for SecretMasker {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretMasker {
    #[must_use]
    pub fn new() -> Self {
        let patterns = SECRET_PATTERNS
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|re| (re, *replacement))
            })
            .collect();

        Self { patterns }
    }

    /// Mask secrets in a string, borrowing when nothing matched.
    #[must_use]
    pub fn mask<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(text);

        for (pattern, replacement) in &self.patterns {
            if pattern.is_match(&result) {
                result = Cow::Owned(pattern.replace_all(&result, *replacement).into_owned());
            }
        }

        result
    }

    #[must_use]
    pub fn contains_secret(&self, text: &str) -> bool {
        self.patterns.iter().any(|(pattern, _)| pattern.is_match(text))
    }
}

static MASKER: LazyLock<SecretMasker> = LazyLock::new(SecretMasker::new);

/// Mask secrets using the shared masker.
#[must_use]
pub fn mask_secrets(text: &str) -> Cow<'_, str> {
    MASKER.mask(text)
}

#[must_use]
pub fn contains_secrets(text: &str) -> bool {
    MASKER.contains_secret(text)
}
