//! Worksheet tab label rules
//!
//! Excel limits labels to 31 characters, forbids `[ ] : * ? / \`, and
//! compares names case-insensitively.

/// Maximum worksheet label length in characters
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Make a label acceptable to Excel
///
/// Forbidden characters become `_`, surrounding apostrophes and whitespace
/// are trimmed, and the result is cut to 31 characters. An empty result
/// falls back to `fallback`.
pub fn sanitize_sheet_name(raw: &str, fallback: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if FORBIDDEN.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    let cut: String = trimmed.chars().take(MAX_SHEET_NAME_LEN).collect();
    let cut = cut.trim_end().to_string();
    if cut.is_empty() {
        fallback.chars().take(MAX_SHEET_NAME_LEN).collect()
    } else {
        cut
    }
}

/// Pick a label not yet in `taken`, appending ` (n)` from 2 upwards
///
/// The base is shortened so the suffixed label still fits in 31 characters.
pub fn dedupe_sheet_name(base: &str, taken: &[String]) -> String {
    let is_taken = |candidate: &str| {
        taken
            .iter()
            .any(|t| t.to_lowercase() == candidate.to_lowercase())
    };

    if !is_taken(base) {
        return base.to_string();
    }

    let mut n = 2u32;
    loop {
        let suffix = format!(" ({n})");
        let room = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
        let stem: String = base.chars().take(room).collect();
        let candidate = format!("{}{}", stem.trim_end(), suffix);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
