// src/core/profile/id.rs

use once_cell::sync::Lazy;
use regex::Regex;

// v2 (16 chars) and v3 (56 chars) onion service names, base32 lowercase.
static ONION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-z2-7]{16}|[a-z2-7]{56})$").expect("static regex"));

/// Returns true if `candidate` looks like a buddy identifier.
pub fn is_onion_id(candidate: &str) -> bool {
    ONION_ID.is_match(candidate)
}

/// Extracts the identifier from a hostname line such as `abcdefghijklmnop.onion`.
pub fn id_from_hostname(contents: &str) -> Option<String> {
    let line = contents.lines().next()?.trim();
    let id = line.strip_suffix(".onion").unwrap_or(line);
    is_onion_id(id).then(|| id.to_string())
}
