//! # quick-xlsx
//!
//! Spreadsheet (xlsx) package library - low-level document capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to fill a workbook:
//! - Loading/saving the OOXML zip container part by part
//! - A1 cell addressing (`CellRef`)
//! - Part-preserving cell patches (styles, drawings, print setup survive)
//! - Duplicating, renaming and appending worksheets
//! - Generating simple worksheets from rows (`SheetBuilder`)
//! - Reading cell values back (shared strings + inline strings)
//!
//! Business logic (WHAT to write) stays in application code:
//! - Field → cell mapping, validation → order-engine
//! - File naming, destinations → order-engine
//!
//! ## Example
//!
//! ```ignore
//! use quick_xlsx::{CellPatches, CellRef, XlsxPackage};
//!
//! let mut pkg = XlsxPackage::from_bytes(&template_bytes)?;
//! let sheet = pkg.first_sheet()?;
//!
//! let mut patches = CellPatches::new();
//! patches.set(CellRef::parse("B2")?, "张三");
//! patches.set(CellRef::parse("F20")?, 128.5);
//! pkg.apply_cell_patches(&sheet.name, &patches)?;
//!
//! let bytes = pkg.to_bytes()?;
//! ```

mod cell;
mod error;
mod generate;
mod package;
mod patch;
mod read;
mod sheet_name;
mod workbook;
mod xml;

// Re-exports
pub use cell::{CellRef, CellValue, MAX_COLUMN, MAX_ROW, column_index, column_letters};
pub use error::{XlsxError, XlsxResult};
pub use generate::SheetBuilder;
pub use package::{SheetInfo, XlsxPackage};
pub use patch::CellPatches;
pub use sheet_name::{MAX_SHEET_NAME_LEN, dedupe_sheet_name, sanitize_sheet_name};
