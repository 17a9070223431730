//! Reversible PII masking.
//!
//! Detection runs a fixed, ordered battery of regex categories over the
//! text; each distinct matched value is replaced everywhere by a stable
//! placeholder token like `[EMAIL_1]`. The token→value map lives only in
//! the sanitizer instance that produced it and is cleared when the
//! request that owns it finishes. Placeholders are chosen so no pattern
//! in the battery can match a placeholder, which makes `sanitize`
//! idempotent over already-masked text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Token → original value, for one request's lifetime.
pub type SessionMap = HashMap<String, String>;

/// Detection battery. Order matters: earlier categories claim their
/// matches before later, broader ones get to run.
static PII_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        // 9-digit national id numbers, standalone.
        ("NATIONAL_ID", regex(r"\b\d{9}\b")),
        // Local phone formats: 05X mobile or area-code landline, optional dashes.
        ("PHONE", regex(r"\b0(?:5\d|[23489])-?\d{3}-?\d{4}\b")),
        ("EMAIL", regex(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")),
        ("CREDIT_CARD", regex(r"\b(?:\d{4}[ -]?){3}\d{4}\b")),
        ("IBAN", regex(r"\b[A-Z]{2}\d{2}[A-Z0-9]{8,30}\b")),
        ("IP_ADDR", regex(r"\b(?:\d{1,3}\.){3}\d{1,3}\b")),
        // Key=value credential shapes.
        ("PASSWORD", regex(r"(?i)\b(?:password|passwd|pwd)\s*[:=]\s*\S+")),
        ("API_KEY", regex(r"(?i)\b(?:api[_-]?key|token|secret)\s*[:=]\s*[A-Za-z0-9._\-]{8,}")),
    ]
});

fn regex(pattern: &str) -> Regex {
    // Patterns are compile-time constants; a failure here is a programming error.
    #[allow(clippy::unwrap_used)]
    Regex::new(pattern).unwrap()
}

/// One sanitizer per request. State is the per-category counters plus the
/// bidirectional value↔token maps accumulated across `sanitize` calls.
#[derive(Default)]
pub struct PiiSanitizer {
    token_to_value: HashMap<String, String>,
    value_to_token: HashMap<String, String>,
    counters: HashMap<&'static str, u32>,
}

impl PiiSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask every detected PII value in `text`. Returns the masked text
    /// plus the token→value map covering the tokens minted (or reused)
    /// for this text.
    pub fn sanitize(&mut self, text: &str) -> (String, SessionMap) {
        let mut masked = text.to_string();
        let mut session = SessionMap::new();

        for (category, pattern) in PII_PATTERNS.iter() {
            // Collect first: replacement shifts offsets under find_iter.
            let mut values: Vec<String> = pattern
                .find_iter(&masked)
                .map(|m| m.as_str().to_string())
                .collect();
            values.dedup();

            for value in values {
                let token = self.token_for(category, &value);
                session.insert(token.clone(), value.clone());
                masked = masked.replace(&value, &token);
            }
        }

        (masked, session)
    }

    /// Restore original values for every token of `session` present in `text`.
    pub fn rehydrate(&self, text: &str, session: &SessionMap) -> String {
        let mut restored = text.to_string();
        for (token, value) in session {
            if restored.contains(token.as_str()) {
                restored = restored.replace(token.as_str(), value);
            }
        }
        restored
    }

    /// Drop every mapping from `session`. After this the tokens are dead:
    /// the same value sanitized again mints a fresh token.
    pub fn clear_session(&mut self, session: &SessionMap) {
        for (token, value) in session {
            self.token_to_value.remove(token);
            self.value_to_token.remove(value);
        }
    }

    /// Tokens currently live in this sanitizer.
    pub fn active_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.token_to_value.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    fn token_for(&mut self, category: &'static str, value: &str) -> String {
        if let Some(existing) = self.value_to_token.get(value) {
            return existing.clone();
        }
        let counter = self.counters.entry(category).or_insert(0);
        *counter += 1;
        let token = format!("[{category}_{counter}]");
        self.token_to_value.insert(token.clone(), value.to_string());
        self.value_to_token.insert(value.to_string(), token.clone());
        token
    }
}
