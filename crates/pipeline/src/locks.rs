//! Per-conversation invocation locks.
//!
//! Two questions on the same conversation must not both load the same
//! baseline and then overwrite each other's commit. The second caller waits
//! until the first one has committed (or failed) and then loads the
//! extended history. Different conversations never contend.

use ragraph_core::message::ConversationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub struct ConversationLocks {
    inner: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`; released when the guard drops.
    pub async fn acquire(&self, id: &ConversationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Drop entries nobody holds or waits on
            map.retain(|key, lock| key == id || Arc::strong_count(lock) > 1);
            map.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of conversations with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|map| map.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
