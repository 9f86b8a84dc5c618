//! Export file names
//!
//! Patterns use `{date}` (`YYYYMMDD`), `{customerName}` / `{customer}`,
//! `{orderNumber}` / `{orderNo}` and `{licensePlate}`. The rendered name is
//! then sanitized into something every desktop file system accepts.

use regex::{Captures, Regex};
use shared::models::{DEFAULT_FILENAME_PATTERN, FinalizedOrder};
use std::sync::LazyLock;

/// Stem used when nothing usable is left after sanitizing
pub const FALLBACK_STEM: &str = "order";

pub const XLSX_EXTENSION: &str = ".xlsx";

const ILLEGAL: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const SEPARATORS: [char; 3] = ['_', '-', '.'];

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(date|customerName|customer|orderNumber|orderNo|licensePlate)\}")
        .expect("filename token regex is valid")
});

/// Substitute order values into a filename pattern
pub fn render_filename(pattern: &str, order: &FinalizedOrder) -> String {
    let pattern = if pattern.trim().is_empty() {
        DEFAULT_FILENAME_PATTERN
    } else {
        pattern
    };

    // one pass, so values containing `{...}` are never substituted again
    TOKEN_RE
        .replace_all(pattern, |caps: &Captures| match &caps[1] {
            "date" => order.date.format("%Y%m%d").to_string(),
            "customerName" | "customer" => order.customer.name.clone(),
            "orderNumber" | "orderNo" => order.order_number.clone(),
            _ => order.customer.license_plate.clone(),
        })
        .into_owned()
}

/// Make a name safe for the file system and give it a single `.xlsx` extension
///
/// Illegal, control and whitespace characters are removed, runs of `_`, `-`
/// or `.` collapse to one, and separators are trimmed from both ends.
pub fn sanitize_filename(raw: &str) -> String {
    let mut stem = String::with_capacity(raw.len());
    for c in raw.chars() {
        if ILLEGAL.contains(&c) || c.is_control() || c.is_whitespace() {
            continue;
        }
        if SEPARATORS.contains(&c) && stem.ends_with(c) {
            continue;
        }
        stem.push(c);
    }

    let mut stem = stem.as_str();
    loop {
        let next = strip_suffix_ignore_case(stem, XLSX_EXTENSION)
            .unwrap_or(stem)
            .trim_matches(|c| SEPARATORS.contains(&c));
        if next == stem {
            break;
        }
        stem = next;
    }

    if stem.is_empty() {
        format!("{FALLBACK_STEM}{XLSX_EXTENSION}")
    } else {
        format!("{stem}{XLSX_EXTENSION}")
    }
}

/// Rendered and sanitized file name for one order
pub fn order_filename(pattern: &str, order: &FinalizedOrder) -> String {
    sanitize_filename(&render_filename(pattern, order))
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    if !text.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = text.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}
