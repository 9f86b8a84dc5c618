//! Unified error system for QuickSales
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified response format for command surfaces
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Order and draft errors
//! - 6xxx: Template and export errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::with_message(ErrorCode::TemplateNotFound, "No default template");
//! let err = err.with_detail("template_id", "tpl-1");
//! let response = ApiResponse::<()>::from(err);
//! assert_eq!(response.code, Some(6001));
//! ```

mod codes;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError};
