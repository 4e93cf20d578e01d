// src/core/commands/helpers.rs

//! Helpers for slicing raw argument strings.
//!
//! Splitting follows the protocol's whitespace rules: leading whitespace is
//! skipped, the first whitespace run delimits the head, and the remainder keeps
//! its inner spacing verbatim (message bodies are never re-joined).

/// Splits `input` into its first word and the remainder.
///
/// Returns `None` if `input` contains no word at all. The remainder is `None`
/// when nothing but whitespace follows the first word.
pub fn split_first(input: &str) -> Option<(&str, Option<&str>)> {
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.find(char::is_whitespace) {
        Some(end) => {
            let head = &trimmed[..end];
            let rest = trimmed[end..].trim_start();
            Some((head, (!rest.is_empty()).then_some(rest)))
        }
        None => Some((trimmed, None)),
    }
}

/// Returns the first two whitespace-separated words of `input`, ignoring any extra words.
pub fn split_pair(input: &str) -> (Option<&str>, Option<&str>) {
    let mut words = input.split_whitespace();
    (words.next(), words.next())
}
