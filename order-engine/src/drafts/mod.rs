//! Draft tabs
//!
//! Up to four in-progress orders edited side by side. The arena owns every
//! tab until the draft is saved; saving copies the data into a
//! `FinalizedOrder` owned by the record store.

pub mod arena;

pub use arena::{CreatedTab, DraftArena, EvictionPolicy, MAX_TABS, NEW_TAB_TITLE};
