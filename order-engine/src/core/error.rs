//! Engine errors
//!
//! Validation problems are collected into [`ValidationErrors`] so a caller
//! sees every issue at once. Everything else is an [`EngineError`] variant.
//! Command surfaces convert both into [`AppError`] with an [`ErrorCode`].

use crate::orders::storage::StorageError;
use quick_xlsx::XlsxError;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use std::fmt;
use thiserror::Error;

/// One validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("required field `{field}` has no cell mapping")]
    MissingRequiredMapping { field: String },

    #[error("required item attribute `{field}` has no column")]
    MissingRequiredColumn { field: String },

    #[error("item start row must be at least 2, got {row}")]
    InvalidStartRow { row: i32 },

    #[error("item end row {end} is before start row {start}")]
    InvalidItemRegion { start: i32, end: i32 },

    #[error("{items} items do not fit the template region of {capacity} rows")]
    ItemOverflow { items: usize, capacity: usize },

    #[error("`{field}` has malformed cell address `{address}`")]
    MalformedCellAddress { field: String, address: String },

    #[error("order has no customer")]
    MissingCustomer,

    #[error("order has no items")]
    EmptyItems,

    #[error("line {line}: quantity must be a positive number, got {value}")]
    InvalidQuantity { line: usize, value: f64 },

    #[error("line {line}: price must be a non-negative number, got {value}")]
    InvalidPrice { line: usize, value: f64 },

    #[error("pattern `{pattern}` has no {{SEQ}} token")]
    MissingSequenceToken { pattern: String },

    #[error("order number {number} is already used by another order")]
    DuplicateOrderNumber { number: String },

    #[error("no orders selected for batch export")]
    EmptyBatch,

    /// Issue found while checking one order of a batch
    #[error("{order_number}: {issue}")]
    InOrder {
        order_number: String,
        issue: Box<ValidationIssue>,
    },
}

impl ValidationIssue {
    /// Most specific error code for this issue
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingRequiredMapping { .. }
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidStartRow { .. }
            | Self::InvalidItemRegion { .. }
            | Self::MalformedCellAddress { .. } => ErrorCode::TemplateMappingInvalid,
            Self::ItemOverflow { .. } => ErrorCode::TemplateItemOverflow,
            Self::MissingCustomer => ErrorCode::OrderMissingCustomer,
            Self::EmptyItems => ErrorCode::OrderEmpty,
            Self::InvalidQuantity { .. } | Self::InvalidPrice { .. } => ErrorCode::ValidationFailed,
            Self::MissingSequenceToken { .. } => ErrorCode::InvalidFormat,
            Self::DuplicateOrderNumber { .. } => ErrorCode::DuplicateOrderNumber,
            Self::EmptyBatch => ErrorCode::ExportEmptyBatch,
            Self::InOrder { issue, .. } => issue.code(),
        }
    }
}

/// Aggregated validation failure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl std::error::Error for ValidationErrors {}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.0.push(issue);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Wrap every issue with the order it belongs to
    pub fn for_order(self, order_number: &str) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|issue| ValidationIssue::InOrder {
                    order_number: order_number.to_string(),
                    issue: Box::new(issue),
                })
                .collect(),
        )
    }

    /// Shared code when all issues agree, `ValidationFailed` otherwise
    pub fn code(&self) -> ErrorCode {
        let mut codes = self.0.iter().map(ValidationIssue::code);
        match codes.next() {
            Some(first) if codes.all(|c| c == first) => first,
            _ => ErrorCode::ValidationFailed,
        }
    }
}

impl From<ValidationIssue> for ValidationErrors {
    fn from(issue: ValidationIssue) -> Self {
        Self(vec![issue])
    }
}

/// What a `NotFound` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Order,
    Customer,
    Template,
    /// Template exists but carries no workbook
    TemplatePayload,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "Order",
            Self::Customer => "Customer",
            Self::Template => "Template",
            Self::TemplatePayload => "Template file",
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            Self::Order => ErrorCode::OrderNotFound,
            Self::Customer => ErrorCode::CustomerNotFound,
            Self::Template => ErrorCode::TemplateNotFound,
            Self::TemplatePayload => ErrorCode::TemplatePayloadInvalid,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine errors
///
/// A cancelled destination prompt is `Ok(None)`, never an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The atomic sequence increment failed; never retried
    #[error("Order number allocation failed: {0}")]
    Allocation(#[source] StorageError),

    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: String },

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Draft tab error: {0}")]
    Arena(#[from] ArenaError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(resource: Resource, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }
}

impl From<ValidationIssue> for EngineError {
    fn from(issue: ValidationIssue) -> Self {
        Self::Validation(issue.into())
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateOrderNumber { number, .. } => {
                ValidationIssue::DuplicateOrderNumber { number }.into()
            }
            StorageError::OrderNotFound(id) => Self::not_found(Resource::Order, id),
            other => Self::Storage(other),
        }
    }
}

/// Draft tab errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("The last open tab cannot be closed")]
    LastTab,

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    #[error("Every other tab has unsaved changes")]
    AllTabsDirty,
}

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    if let StorageError::Serialization(_) = e {
        return ErrorCode::InternalError;
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }
    if err_str.contains("already open") || err_str.contains("locked") {
        return ErrorCode::SystemBusy;
    }

    ErrorCode::DatabaseError
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(errors) => {
                let issues = serde_json::to_value(errors.issues()).unwrap_or_default();
                let messages: Vec<String> = errors.0.iter().map(|i| i.to_string()).collect();
                AppError::with_message(errors.code(), errors.to_string())
                    .with_detail("issues", issues)
                    .with_detail("messages", messages)
            }
            EngineError::Allocation(e) => {
                tracing::error!(error = %e, "Order number allocation failed");
                AppError::with_message(ErrorCode::OrderNumberAllocationFailed, e.to_string())
            }
            EngineError::NotFound { resource, id } => {
                AppError::with_message(resource.code(), format!("{resource} not found: {id}"))
                    .with_detail("resource", resource.as_str())
                    .with_detail("id", id)
            }
            EngineError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            EngineError::Sheet(e) => {
                tracing::warn!(error = %e, "Spreadsheet processing failed");
                AppError::with_message(ErrorCode::ExportFailed, e.to_string())
            }
            EngineError::Io(e) => {
                tracing::error!(error = %e, "Export write failed");
                AppError::with_message(ErrorCode::FileWriteFailed, e.to_string())
            }
            EngineError::Arena(e) => e.into(),
        }
    }
}

impl From<ArenaError> for AppError {
    fn from(err: ArenaError) -> Self {
        let code = match &err {
            ArenaError::LastTab => ErrorCode::DraftLastTab,
            ArenaError::TabNotFound(_) => ErrorCode::DraftTabNotFound,
            ArenaError::AllTabsDirty => ErrorCode::DraftTabsAllDirty,
        };
        AppError::with_message(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_aggregate_and_display() {
        let mut errors = ValidationErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.push(ValidationIssue::InvalidStartRow { row: 1 });
        errors.push(ValidationIssue::ItemOverflow {
            items: 11,
            capacity: 10,
        });
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.to_string(),
            "item start row must be at least 2, got 1; 11 items do not fit the template region of 10 rows"
        );
        assert_eq!(errors.code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_issue_prefixed_with_order_number() {
        let errors = ValidationErrors::from(ValidationIssue::EmptyItems).for_order("NO.000003");
        assert_eq!(errors.to_string(), "NO.000003: order has no items");
        assert_eq!(errors.code(), ErrorCode::OrderEmpty);
    }

    #[test]
    fn test_duplicate_number_becomes_validation() {
        let err: EngineError = StorageError::DuplicateOrderNumber {
            number: "NO.000001".to_string(),
            order_id: "o1".to_string(),
        }
        .into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::DuplicateOrderNumber);
        assert!(app.details.unwrap().contains_key("issues"));
    }

    #[test]
    fn test_not_found_maps_to_resource_code() {
        let app: AppError = EngineError::not_found(Resource::Template, "tpl-9").into();
        assert_eq!(app.code, ErrorCode::TemplateNotFound);
        assert_eq!(app.message, "Template not found: tpl-9");
    }

    #[test]
    fn test_arena_error_codes() {
        let app: AppError = ArenaError::LastTab.into();
        assert_eq!(app.code, ErrorCode::DraftLastTab);
        let app: AppError = ArenaError::TabNotFound("t".into()).into();
        assert_eq!(app.code, ErrorCode::DraftTabNotFound);

        let app: AppError = EngineError::from(ArenaError::AllTabsDirty).into();
        assert_eq!(app.code, ErrorCode::DraftTabsAllDirty);
    }
}
