//! Pipeline event system — observe invocations without coupling to them.
//!
//! The orchestrator publishes an event whenever it enters a node, takes a
//! routing decision, commits a turn, or aborts. Subscribers (the CLI in
//! verbose mode, tests) filter for what they care about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All pipeline events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A new question arrived for a conversation
    InvocationStarted {
        conversation_id: String,
        prior_turns: usize,
        timestamp: DateTime<Utc>,
    },

    /// The orchestrator is about to run a node
    NodeEntered {
        conversation_id: String,
        node: String,
        refinement_attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// A router picked the next node
    RouteDecided {
        conversation_id: String,
        router: String,
        next: String,
        timestamp: DateTime<Utc>,
    },

    /// A terminal node ran and the turns were persisted
    TurnCommitted {
        conversation_id: String,
        terminal: String,
        total_turns: usize,
        timestamp: DateTime<Utc>,
    },

    /// The invocation aborted; nothing was persisted
    InvocationFailed {
        conversation_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for pipeline events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<PipelineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PipelineEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
