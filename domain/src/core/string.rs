//! String utilities for the domain layer.

/// Canonical form of a member-submitted choice: trimmed and lower-cased.
///
/// Two submissions that differ only in case or surrounding whitespace
/// count as the same choice.
pub fn normalize_choice(s: &str) -> String {
    s.trim().to_lowercase()
}
