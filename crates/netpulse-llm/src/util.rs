//! Common utilities for LLM output handling

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Mask API key for safe display in logs
///
/// # Examples
/// ```
/// use netpulse_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY || !key.is_ascii() {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        &key[..KEY_MASK_VISIBLE_CHARS],
        &key[key.len() - KEY_MASK_VISIBLE_CHARS..]
    )
}

/// Truncate a string to at most `max_bytes`, never splitting a UTF-8 char.
#[must_use]
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Extract the outermost JSON object from free-form model output.
///
/// Models frequently wrap JSON in markdown fences or prose. This returns the
/// slice from the first `{` to the last `}`, or `None` when no such span exists.
///
/// # Examples
/// ```
/// use netpulse_llm::util::extract_json_object;
/// let text = "Here you go:\n```json\n{\"a\": 1}\n```";
/// assert_eq!(extract_json_object(text), Some("{\"a\": 1}"));
/// assert_eq!(extract_json_object("no json here"), None);
/// ```
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Substitute `{key}` placeholders in one pass.
///
/// Substituted text is never scanned again, so a value that itself contains
/// `{key}` comes through verbatim. Braces that name no key are kept.
///
/// # Examples
/// ```
/// use netpulse_llm::util::fill_template;
/// let prompt = fill_template("{tool}: {result}", &[("tool", "ping"), ("result", "{tool}")]);
/// assert_eq!(prompt, "ping: {tool}");
/// ```
#[must_use]
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = values.iter().find(|(key, _)| {
            tail.strip_prefix(key)
                .is_some_and(|after| after.starts_with('}'))
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
