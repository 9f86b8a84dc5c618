//! Template binding
//!
//! - **layout**: mapping parse + validation (`TemplateLayout`)
//! - **binder**: writes an order into an in-memory copy of the workbook

pub mod binder;
pub mod layout;

pub use binder::{BoundDocument, TemplateBinder, format_excel_date};
pub use layout::{
    HeaderField, ItemField, MIN_ITEM_START_ROW, RowBound, TemplateLayout, validate,
};

#[cfg(test)]
pub(crate) mod tests;
