//! Missed-session discovery.
//!
//! Capture ids are mined from free text (chat history, logs), so a match is
//! a candidate, not a certainty.

use regex::Regex;
use std::sync::LazyLock;

static CAPTURE_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bcapture_[A-Za-z0-9_-]+").expect("CAPTURE_ID_REGEX is a compile-time constant")
});

static SESSION_FIELD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)session[_ ]?id["']?\s*[:=]\s*["']?([A-Za-z0-9_-]+)"#)
        .expect("SESSION_FIELD_REGEX is a compile-time constant")
});

/// Distinct capture session ids in `history`, in first-seen order
#[must_use]
pub fn find_session_ids<S: AsRef<str>>(history: &[S]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |id: &str| {
        if !found.iter().any(|known| known == id) {
            found.push(id.to_string());
        }
    };

    for entry in history {
        let text = entry.as_ref();
        for m in CAPTURE_ID_REGEX.find_iter(text) {
            push(m.as_str());
        }
        for caps in SESSION_FIELD_REGEX.captures_iter(text) {
            if let Some(id) = caps.get(1) {
                push(id.as_str());
            }
        }
    }

    found
}
