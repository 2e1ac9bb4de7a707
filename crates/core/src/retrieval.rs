//! Retriever trait — the passage-retrieval capability.
//!
//! The pipeline only depends on the query contract: given a query and a
//! result count, return at most `k` passages, best match first. How the
//! index was built is somebody else's problem.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// A retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Stable passage ID (document id + chunk index, or similar)
    pub id: String,

    /// The passage text
    pub content: String,

    /// Originating document (file name, paper title, ...)
    #[serde(default)]
    pub source: String,

    /// Similarity / relevance score assigned by the retriever
    #[serde(default)]
    pub score: f32,
}

/// A search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search text
    pub text: String,

    /// Maximum number of results
    #[serde(default = "default_k")]
    pub k: usize,

    /// Restrict results to these sources (empty = no restriction)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

fn default_k() -> usize {
    2
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, k: usize) -> Self {
        Self {
            text: text.into(),
            k,
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Whether a passage from `source` passes the source filter.
    pub fn admits(&self, source: &str) -> bool {
        self.sources.is_empty() || self.sources.iter().any(|s| s == source)
    }
}

/// The core Retriever trait.
///
/// Implementations: keyword index, embedding index, test stubs.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// The retriever name (e.g., "keyword", "embedding").
    fn name(&self) -> &str;

    /// Return at most `query.k` passages, best match first.
    async fn search(&self, query: &SearchQuery) -> std::result::Result<Vec<Passage>, RetrievalError>;
}
