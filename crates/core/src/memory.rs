//! Conversation memory — persisted turn history keyed by conversation.
//!
//! The pipeline reads a conversation's turns at the start of an invocation
//! and writes the full, extended list back once a terminal node has run.
//! A `put` replaces the stored list atomically: readers see either the old
//! turns or the new ones, never a mix.

use async_trait::async_trait;
use crate::error::MemoryError;
use crate::message::{ConversationId, Message};

/// The core ConversationStore trait.
///
/// Implementations: in-memory map, JSON files, SQLite.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "file", "sqlite").
    fn name(&self) -> &str;

    /// Load the turns for a conversation. Unknown ids yield an empty list.
    async fn get(&self, id: &ConversationId) -> std::result::Result<Vec<Message>, MemoryError>;

    /// Replace the stored turns for a conversation.
    async fn put(&self, id: &ConversationId, turns: &[Message]) -> std::result::Result<(), MemoryError>;

    /// All known conversation ids, sorted.
    async fn list(&self) -> std::result::Result<Vec<ConversationId>, MemoryError>;

    /// Remove a conversation. Returns whether it existed.
    async fn delete(&self, id: &ConversationId) -> std::result::Result<bool, MemoryError>;
}
