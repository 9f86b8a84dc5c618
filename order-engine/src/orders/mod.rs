//! Orders
//!
//! - **storage**: redb record store (orders, customers, templates, settings, sequences)
//! - **traits**: collaborator seams the engine is written against
//! - **service**: draft → finalized order, with optional export

pub mod service;
pub mod storage;
pub mod traits;

pub use service::{ExportStatus, OrderService, SavedOrder, validate_draft};
pub use storage::{OrderStorage, StorageError, StorageResult};
pub use traits::{
    BucketKey, DestinationPrompt, GLOBAL_BUCKET, OrderRecordStore, SequenceSource,
    SettingsProvider, TemplateStore,
};

#[cfg(test)]
mod tests;
