//! Credential scrubbing for messages that leave the process (logs, API
//! responses, stream error events).

use once_cell::sync::Lazy;
use regex::Regex;

const REDACTED: &str = "[REDACTED]";

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    [
        // Authorization: Bearer <token>
        (r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+", "Bearer [REDACTED]"),
        // api_key=..., "token": "...", secret: ...
        (
            r#"(?i)\b(api[_-]?key|access[_-]?token|refresh[_-]?token|token|client[_-]?secret|secret|password)(["']?\s*[:=]\s*["']?)[^\s"',}]+"#,
            "${1}${2}[REDACTED]",
        ),
        // vendor keys such as sk-..., sk-or-v1-...
        (r"\bsk-[A-Za-z0-9_-]{8,}", REDACTED),
        // long opaque strings
        (r"\b[A-Za-z0-9_-]{32,}\b", REDACTED),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| {
        Regex::new(pattern)
            .ok()
            .map(|pattern| Rule { pattern, replacement })
    })
    .collect()
});

/// Replaces credential-shaped substrings with `[REDACTED]`.
pub fn scrub_secrets(message: &str) -> String {
    let mut scrubbed = message.to_string();
    for rule in RULES.iter() {
        scrubbed = rule
            .pattern
            .replace_all(&scrubbed, rule.replacement)
            .into_owned();
    }
    scrubbed
}
