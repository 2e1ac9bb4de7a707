//! File-based conversation store: one JSON document per conversation.
//!
//! Storage location: `~/.ragraph/conversations/<encoded-id>.json`
//!
//! Each document holds `{ id, updated_at, turns }`. A `put` writes the new
//! document next to the target and renames it over the old one, so a reader
//! never observes a half-written history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ragraph_core::error::MemoryError;
use ragraph_core::memory::ConversationStore;
use ragraph_core::message::{ConversationId, Message};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// On-disk layout of a conversation document.
#[derive(Debug, Serialize, Deserialize)]
struct ConversationDocument {
    id: ConversationId,
    updated_at: DateTime<Utc>,
    turns: Vec<Message>,
}

/// A directory of JSON conversation documents.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File conversation store opened");
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ConversationId) -> PathBuf {
        self.dir.join(format!("{}.json", encode_id(id.as_str())))
    }

    async fn read_document(path: &Path) -> Result<Option<ConversationDocument>, MemoryError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            MemoryError::Storage(format!("Corrupt conversation file {}: {e}", path.display()))
        })
    }
}

/// Make a conversation id safe to use as a file name.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`. The mapping is injective, so distinct ids never share a file.
fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

#[async_trait]
impl ConversationStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, id: &ConversationId) -> Result<Vec<Message>, MemoryError> {
        let document = Self::read_document(&self.path_for(id)).await?;
        Ok(document.map(|d| d.turns).unwrap_or_default())
    }

    async fn put(&self, id: &ConversationId, turns: &[Message]) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to create conversation directory: {e}"))
        })?;

        let document = ConversationDocument {
            id: id.clone(),
            updated_at: Utc::now(),
            turns: turns.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize conversation: {e}")))?;

        let target = self.path_for(id);
        let tmp = target.with_extension("json.tmp");
        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &target)
                .await
                .map_err(|e| format!("Failed to replace conversation file: {e}")),
            Err(e) => Err(format!("Failed to write conversation file: {e}")),
        };
        if let Err(message) = written {
            // Partial writes must not linger next to the real document
            if let Err(e) = tokio::fs::remove_file(&tmp).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %tmp.display(), error = %e, "Failed to remove temp file");
            }
            return Err(MemoryError::Storage(message));
        }

        debug!(conversation_id = %id, turns = turns.len(), "Conversation written");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConversationId>, MemoryError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MemoryError::Storage(format!("Failed to list conversations: {e}"))),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to list conversations: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_document(&path).await {
                Ok(Some(document)) => ids.push(document.id),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Skipping unreadable conversation file"),
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, MemoryError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MemoryError::Storage(format!(
                "Failed to delete conversation file: {e}"
            ))),
        }
    }
}
