/// Normalize an invocation event for the `--event` argument.
///
/// Blank input becomes empty. Valid JSON is re-serialized compactly with its
/// key order intact. Anything else is passed through untouched.
pub fn normalize_event(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => value.to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "Event is not JSON, passing it through raw");
            raw.to_string()
        }
    }
}

/// Quote a value for a POSIX shell single-quoted word.
pub fn shell_single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render a value as one shell word, quoting only when it needs it.
pub fn shell_word(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        value.to_string()
    } else {
        shell_single_quote(value)
    }
}
