//! Conversation memory backends for Ragraph.
//!
//! All stores implement `ragraph_core::ConversationStore`.
//! `build_from_config` picks one according to `[memory]` in the config.

pub mod file_backend;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use ragraph_config::AppConfig;
use ragraph_core::error::MemoryError;
use ragraph_core::memory::ConversationStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Open the conversation store selected by `config.memory.backend`.
pub async fn build_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn ConversationStore>, MemoryError> {
    let path = config.memory.path.as_ref().map(PathBuf::from);

    match config.memory.backend.as_str() {
        "in_memory" => Ok(Arc::new(InMemoryStore::new())),
        "file" => {
            let dir = path.unwrap_or_else(AppConfig::default_conversations_dir);
            Ok(Arc::new(FileStore::new(dir)))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let file = path.unwrap_or_else(AppConfig::default_sqlite_path);
            if let Some(parent) = file.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    MemoryError::Storage(format!("Failed to create database directory: {e}"))
                })?;
            }
            let url = format!("sqlite://{}", file.display());
            Ok(Arc::new(SqliteStore::new(&url).await?))
        }
        other => Err(MemoryError::Storage(format!(
            "Memory backend '{other}' is not available in this build"
        ))),
    }
}
