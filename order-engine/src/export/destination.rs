use crate::orders::traits::DestinationPrompt;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Non-interactive prompt that always answers with a directory
///
/// Uses `dir` when set, else the default directory offered by the caller,
/// else the current directory. The suggested name is kept.
#[derive(Debug, Clone, Default)]
pub struct DirectoryDestination {
    dir: Option<PathBuf>,
}

impl DirectoryDestination {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl DestinationPrompt for DirectoryDestination {
    async fn choose(&self, suggested_name: &str, default_dir: Option<&Path>) -> Option<PathBuf> {
        let dir = self
            .dir
            .clone()
            .or_else(|| default_dir.map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Some(dir.join(suggested_name))
    }
}

/// Prompt that always cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct CancelDestination;

#[async_trait]
impl DestinationPrompt for CancelDestination {
    async fn choose(&self, suggested_name: &str, _default_dir: Option<&Path>) -> Option<PathBuf> {
        tracing::debug!(suggested_name, "Export destination prompt cancelled");
        None
    }
}
