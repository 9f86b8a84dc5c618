//! Export
//!
//! - **filename**: file name synthesis and sanitizing
//! - **destination**: non-interactive destination prompts
//! - **coordinator**: single and batch export to xlsx files

pub mod coordinator;
pub mod destination;
pub mod filename;

pub use coordinator::{ExportCoordinator, ExportOutcome, SUMMARY_SHEET_NAME};
pub use destination::{CancelDestination, DirectoryDestination};
pub use filename::{FALLBACK_STEM, order_filename, render_filename, sanitize_filename};

#[cfg(test)]
mod tests;
