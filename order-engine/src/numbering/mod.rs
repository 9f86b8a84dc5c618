//! Order numbering
//!
//! - **format**: pure pattern rendering (`NO.{SEQ:6}` → `NO.000007`)
//! - **allocator**: atomic per-bucket sequence allocation

pub mod allocator;
pub mod format;

pub use allocator::{NumberAllocator, NumberingRules, effective_mode};
pub use format::{MAX_SEQ_WIDTH, format, has_sequence_token};
