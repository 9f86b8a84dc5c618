//! Unified error codes for QuickSales
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order and draft errors
//! - 6xxx: Template and export errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4007,
    /// Order has no customer
    OrderMissingCustomer = 4008,
    /// Order number could not be allocated
    OrderNumberAllocationFailed = 4101,
    /// Order number already issued to another order
    DuplicateOrderNumber = 4102,
    /// Customer not found
    CustomerNotFound = 4201,

    // ==================== 43xx: Draft tabs ====================
    /// Draft tab not found
    DraftTabNotFound = 4301,
    /// The last open tab cannot be closed
    DraftLastTab = 4302,
    /// All other tabs have unsaved changes
    DraftTabsAllDirty = 4303,

    // ==================== 6xxx: Template ====================
    /// Template not found
    TemplateNotFound = 6001,
    /// Template payload missing or unreadable
    TemplatePayloadInvalid = 6002,
    /// Template mapping incomplete or malformed
    TemplateMappingInvalid = 6003,
    /// More items than the template region holds
    TemplateItemOverflow = 6004,

    // ==================== 61xx: Export ====================
    /// Export failed
    ExportFailed = 6101,
    /// Writing the export file failed
    FileWriteFailed = 6102,
    /// Batch export called without orders
    ExportEmptyBatch = 6103,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,

    // ==================== 94xx: Storage ====================
    /// Storage full (disk space insufficient)
    StorageFull = 9401,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
    /// System busy (IO error, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::OrderMissingCustomer => "Order has no customer",
            ErrorCode::OrderNumberAllocationFailed => "Order number allocation failed",
            ErrorCode::DuplicateOrderNumber => "Order number already in use",
            ErrorCode::CustomerNotFound => "Customer not found",

            // Draft tabs
            ErrorCode::DraftTabNotFound => "Draft tab not found",
            ErrorCode::DraftLastTab => "Cannot close the last tab",
            ErrorCode::DraftTabsAllDirty => "All other tabs have unsaved changes",

            // Template
            ErrorCode::TemplateNotFound => "Template not found",
            ErrorCode::TemplatePayloadInvalid => "Template file is missing or unreadable",
            ErrorCode::TemplateMappingInvalid => "Template mapping is invalid",
            ErrorCode::TemplateItemOverflow => "Too many items for the template",

            // Export
            ErrorCode::ExportFailed => "Export failed",
            ErrorCode::FileWriteFailed => "Failed to write file",
            ErrorCode::ExportEmptyBatch => "No orders selected for export",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",

            // Storage
            ErrorCode::StorageFull => "Storage full",
            ErrorCode::StorageCorrupted => "Storage corrupted",
            ErrorCode::SystemBusy => "System busy, retry later",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::OrderMissingCustomer),
            4101 => Ok(ErrorCode::OrderNumberAllocationFailed),
            4102 => Ok(ErrorCode::DuplicateOrderNumber),
            4201 => Ok(ErrorCode::CustomerNotFound),

            // Draft tabs
            4301 => Ok(ErrorCode::DraftTabNotFound),
            4302 => Ok(ErrorCode::DraftLastTab),
            4303 => Ok(ErrorCode::DraftTabsAllDirty),

            // Template
            6001 => Ok(ErrorCode::TemplateNotFound),
            6002 => Ok(ErrorCode::TemplatePayloadInvalid),
            6003 => Ok(ErrorCode::TemplateMappingInvalid),
            6004 => Ok(ErrorCode::TemplateItemOverflow),

            // Export
            6101 => Ok(ErrorCode::ExportFailed),
            6102 => Ok(ErrorCode::FileWriteFailed),
            6103 => Ok(ErrorCode::ExportEmptyBatch),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),

            // Storage
            9401 => Ok(ErrorCode::StorageFull),
            9403 => Ok(ErrorCode::StorageCorrupted),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
