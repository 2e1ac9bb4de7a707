//! The conversational retrieval pipeline at the heart of Ragraph.
//!
//! One user turn walks a small state machine:
//!
//! 1. **Rephrase** a follow-up into a standalone query (skipped on the first turn)
//! 2. **Classify** the query as on- or off-topic
//! 3. **Retrieve** passages for the query
//! 4. **Evaluate** each passage's relevance, keeping retrieval order
//! 5. **Tweak** the query and retrieve again while attempts remain
//! 6. End in **Respond**, **Reject** or **Fallback**, which append the
//!    assistant turn; the orchestrator then commits the conversation
//!
//! Everything external (text generation, retrieval, conversation storage)
//! is injected through the `ragraph_core` capability traits.

pub mod grading;
pub mod graph;
pub mod locks;
pub mod nodes;
pub mod orchestrator;
pub mod prompts;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use grading::Grade;
pub use graph::{DecisionRoute, NodeKind, TopicRoute};
pub use orchestrator::{Orchestrator, PipelineBuilder, PipelineSettings};
pub use state::{Citation, DialogState, Outcome, Reply, TopicFlag};
