//! String utilities for the domain layer.

/// Truncate a string to at most `max_len` bytes, appending "..." when cut.
///
/// Never splits a UTF-8 character.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let mut end = max_len.saturating_sub(3);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// First line of `s`, truncated.
pub fn first_line(s: &str, max_len: usize) -> String {
    truncate(s.lines().next().unwrap_or(""), max_len)
}
