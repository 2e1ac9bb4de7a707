//! Embedding retriever: cosine similarity over provider embeddings.
//!
//! Passage vectors are computed once, on the first search, through the
//! configured [`Provider`]'s `embed` call and kept for the process lifetime.

use crate::corpus::Corpus;
use async_trait::async_trait;
use ragraph_core::error::RetrievalError;
use ragraph_core::provider::{EmbeddingRequest, Provider};
use ragraph_core::retrieval::{Passage, Retriever, SearchQuery};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

pub struct EmbeddingRetriever {
    corpus: Corpus,
    provider: Arc<dyn Provider>,
    model: String,
    vectors: OnceCell<Vec<Vec<f32>>>,
}

impl EmbeddingRetriever {
    pub fn new(corpus: Corpus, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            corpus,
            provider,
            model: model.into(),
            vectors: OnceCell::new(),
        }
    }

    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let expected = inputs.len();
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs,
            })
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != expected {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "expected {expected} vectors, got {}",
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    async fn passage_vectors(&self) -> Result<&Vec<Vec<f32>>, RetrievalError> {
        self.vectors
            .get_or_try_init(|| async {
                let inputs = self
                    .corpus
                    .passages()
                    .iter()
                    .map(|p| p.content.clone())
                    .collect();
                let vectors = self.embed(inputs).await?;
                info!(passages = vectors.len(), model = %self.model, "Corpus embedded");
                Ok::<_, RetrievalError>(vectors)
            })
            .await
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    fn name(&self) -> &str {
        "embedding"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Passage>, RetrievalError> {
        if query.k == 0 {
            return Err(RetrievalError::InvalidQuery("k must be at least 1".into()));
        }
        if self.corpus.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.passage_vectors().await?;
        let query_vector = self
            .embed(vec![query.text.clone()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut scored: Vec<Passage> = self
            .corpus
            .passages()
            .iter()
            .zip(vectors)
            .filter(|(p, _)| query.admits(&p.source))
            .map(|(p, v)| Passage {
                score: cosine_similarity(v, &query_vector),
                ..p.clone()
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.k);

        debug!(query = %query.text, hits = scored.len(), "Embedding search complete");
        Ok(scored)
    }
}
