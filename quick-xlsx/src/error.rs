//! Error types for the xlsx library

use thiserror::Error;

/// Xlsx error types
#[derive(Debug, Error)]
pub enum XlsxError {
    /// Zip container could not be read or written
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error while reading/writing parts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Streaming XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Tree XML parse error
    #[error("XML parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// XML attribute error
    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Part content is not UTF-8
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// A required package part is missing
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// Malformed A1 cell reference or column letters
    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    /// No worksheet with this name
    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    /// A worksheet with this name already exists
    #[error("Duplicate sheet name: {0}")]
    DuplicateSheet(String),

    /// Structurally invalid workbook
    #[error("Invalid workbook: {0}")]
    Invalid(String),
}

/// Result type for xlsx operations
pub type XlsxResult<T> = Result<T, XlsxError>;
