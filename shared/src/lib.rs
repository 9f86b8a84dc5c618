//! Shared types for QuickSales
//!
//! Domain models (drafts, orders, customers, templates, settings) and the
//! unified error types used by the engine and its command surfaces.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
