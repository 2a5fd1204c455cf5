//! Unified diffs between two serializations of an event.

use similar::TextDiff;

/// Unified diff of `old` against `new`, with file headers. Empty when the
/// texts are equal.
pub fn unified_diff(old: &str, new: &str, old_name: &str, new_name: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(old_name, new_name)
        .to_string()
}
