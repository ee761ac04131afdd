//! Shared utility functions used across the codebase.

/// Parse an environment variable as a boolean, returning `default` if unset.
///
/// Recognises `1`, `true`, `yes`, `y`, `on` (case-insensitive) as `true`;
/// everything else (including unset) maps to `default`.
pub fn env_var_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Err(_) => default,
    }
}

/// Byte index of the end of the first `max_chars` characters of `s`.
fn char_boundary(s: &str, max_chars: usize) -> usize {
    s.char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

/// The first `max_chars` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    &s[..char_boundary(s, max_chars)]
}

/// Split `s` into consecutive pieces of at most `chunk_chars` characters.
///
/// Returns an empty vector for empty input. `chunk_chars` of zero is treated as one.
pub fn chunk_chars(s: &str, chunk_chars: usize) -> Vec<&str> {
    let size = chunk_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let end = char_boundary(rest, size);
        chunks.push(&rest[..end]);
        rest = &rest[end..];
    }
    chunks
}

/// Remove line breaks (`\n` and `\r\n`) so text fits on a single status line.
pub fn strip_newlines(s: &str) -> String {
    s.replace("\r\n", "").replace('\n', "")
}

/// Remove one leading and one trailing double quote, if present.
///
/// Models tend to wrap generated search queries in quotes; inner quotes are kept.
pub fn strip_wrapping_quotes(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}
