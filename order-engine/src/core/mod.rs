pub mod config;
pub mod error;
pub mod state;

pub use config::Config;
pub use error::{
    ArenaError, EngineError, EngineResult, Resource, ValidationErrors, ValidationIssue,
};
pub use state::EngineState;
