//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use ragraph_core::error::MemoryError;
use ragraph_core::memory::ConversationStore;
use ragraph_core::message::{ConversationId, Message};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A conversation store that keeps every conversation in a HashMap.
/// Nothing survives the process.
pub struct InMemoryStore {
    conversations: Arc<RwLock<HashMap<ConversationId, Vec<Message>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, id: &ConversationId) -> Result<Vec<Message>, MemoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(id).cloned().unwrap_or_default())
    }

    async fn put(&self, id: &ConversationId, turns: &[Message]) -> Result<(), MemoryError> {
        self.conversations
            .write()
            .await
            .insert(id.clone(), turns.to_vec());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConversationId>, MemoryError> {
        let mut ids: Vec<ConversationId> =
            self.conversations.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, MemoryError> {
        Ok(self.conversations.write().await.remove(id).is_some())
    }
}
