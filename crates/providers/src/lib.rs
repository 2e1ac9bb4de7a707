//! LLM Provider implementations for Ragraph.
//!
//! All providers implement the `ragraph_core::Provider` trait.
//! The router selects the correct provider based on configuration and
//! wraps it in a fallback chain when one is configured.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
