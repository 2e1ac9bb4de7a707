//! # Ragraph Core
//!
//! Domain types, capability traits, and error definitions for the Ragraph
//! conversational retrieval pipeline. This crate has **zero framework
//! dependencies**; it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability is a trait here:
//! - [`Provider`] — text generation (free text or schema-constrained) and embeddings
//! - [`Retriever`] — ranked passage search
//! - [`ConversationStore`] — per-conversation turn history
//!
//! Implementations live in their respective crates, so the pipeline can be
//! driven by real services in production and by deterministic stubs in tests.

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod retrieval;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, RetrievalError};
pub use event::{EventBus, PipelineEvent};
pub use memory::ConversationStore;
pub use message::{ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseSchema};
pub use retrieval::{Passage, Retriever, SearchQuery};
