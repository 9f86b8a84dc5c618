//! Data models
//!
//! Shared between the engine and its command surfaces. IDs are `String`
//! (uuid v4), timestamps are Unix millis.

pub mod customer;
pub mod draft;
pub mod order;
pub mod settings;
pub mod template;

// Re-exports
pub use customer::*;
pub use draft::*;
pub use order::*;
pub use settings::*;
pub use template::*;
