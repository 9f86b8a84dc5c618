//! Order number patterns
//!
//! | Token | Output |
//! |-------|--------|
//! | `{SEQ}` | sequence, zero-padded to the default width |
//! | `{SEQ:n}` | sequence, zero-padded to `n` digits |
//! | `{YYYY}` / `{YY}` | year, 4 or 2 digits |
//! | `{MM}` / `{DD}` | month / day, 2 digits |
//! | `{M}` / `{D}` | month / day, unpadded |
//! | `{CUSTOM}` | custom prefix from settings |
//!
//! Anything else is copied through unchanged.

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Upper bound for `{SEQ:n}` padding
pub const MAX_SEQ_WIDTH: usize = 20;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(SEQ|YYYY|YY|MM|DD|M|D|CUSTOM)(?::(\d+))?\}").expect("token regex is valid")
});

static SEQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{SEQ(?::\d+)?\}").expect("sequence regex is valid"));

/// Whether the pattern consumes a sequence value
pub fn has_sequence_token(pattern: &str) -> bool {
    SEQ_RE.is_match(pattern)
}

/// Render a pattern
///
/// `seq = None` renders sequence tokens as empty (numbers derived from the
/// date and prefix only).
pub fn format(
    pattern: &str,
    seq: Option<u64>,
    date: NaiveDate,
    custom: &str,
    default_width: usize,
) -> String {
    TOKEN_RE
        .replace_all(pattern, |caps: &Captures| {
            let token = &caps[1];
            let width = caps.get(2).map(|m| m.as_str());
            match (token, width) {
                ("SEQ", width) => match seq {
                    Some(value) => {
                        let width = width
                            .and_then(|w| w.parse::<usize>().ok())
                            .unwrap_or(default_width)
                            .min(MAX_SEQ_WIDTH);
                        format!("{value:0width$}")
                    }
                    None => String::new(),
                },
                (_, Some(_)) => caps[0].to_string(),
                ("YYYY", None) => format!("{:04}", date.year()),
                ("YY", None) => format!("{:02}", date.year().rem_euclid(100)),
                ("MM", None) => format!("{:02}", date.month()),
                ("DD", None) => format!("{:02}", date.day()),
                ("M", None) => date.month().to_string(),
                ("D", None) => date.day().to_string(),
                ("CUSTOM", None) => custom.to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}
