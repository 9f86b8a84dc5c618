//! Cell addressing and cell values
//!
//! `CellRef` is the structured form of an "A1" address. Parse text once,
//! then pass the struct around; nothing in the write path re-parses strings.

use crate::error::{XlsxError, XlsxResult};
use std::fmt;

/// Largest zero-based column index Excel accepts (`XFD`)
pub const MAX_COLUMN: u32 = 16_383;

/// Largest one-based row number Excel accepts
pub const MAX_ROW: u32 = 1_048_576;

/// Structured cell address
///
/// `col` is zero-based (`A` = 0), `row` is one-based as displayed in Excel.
/// Ordering is row-major, which is the order cells must appear in sheet XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    /// Create from a zero-based column index and a one-based row number
    pub fn new(col: u32, row: u32) -> Self {
        Self { row, col }
    }

    /// Parse an "A1" style address (absolute markers like `$B$3` are accepted)
    pub fn parse(text: &str) -> XlsxResult<Self> {
        let trimmed = text.trim();
        let invalid = || XlsxError::InvalidCellRef(text.to_string());

        let cleaned: String = trimmed.chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);
        if letters.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let col = column_index(letters).map_err(|_| invalid())?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row > MAX_ROW {
            return Err(invalid());
        }

        Ok(Self { row, col })
    }

    /// Same column, different row
    pub fn with_row(self, row: u32) -> Self {
        Self { row, col: self.col }
    }

    /// Render as "A1" text
    pub fn to_a1(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// Convert column letters (`A`, `Z`, `AA`, ...) to a zero-based index
pub fn column_index(letters: &str) -> XlsxResult<u32> {
    let letters = letters.trim();
    if letters.is_empty() || letters.len() > 3 {
        return Err(XlsxError::InvalidCellRef(letters.to_string()));
    }

    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(XlsxError::InvalidCellRef(letters.to_string()));
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        index = index * 26 + digit;
    }

    let index = index - 1;
    if index > MAX_COLUMN {
        return Err(XlsxError::InvalidCellRef(letters.to_string()));
    }
    Ok(index)
}

/// Convert a zero-based column index to letters
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

/// A value written to or read from a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}
