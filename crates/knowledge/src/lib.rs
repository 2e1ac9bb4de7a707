//! Passage corpora and retrievers for Ragraph.
//!
//! All retrievers implement `ragraph_core::Retriever`. Index construction
//! is deliberately simple: passages arrive pre-chunked in a corpus file (or
//! the bundled Bella Vista sample) and are searched in memory.

pub mod corpus;
pub mod embedding;
pub mod keyword;

pub use corpus::Corpus;
pub use embedding::{EmbeddingRetriever, cosine_similarity};
pub use keyword::KeywordRetriever;

use ragraph_config::AppConfig;
use ragraph_core::error::RetrievalError;
use ragraph_core::provider::Provider;
use ragraph_core::retrieval::Retriever;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Load the configured corpus, or the bundled sample when none is set.
pub fn load_corpus(config: &AppConfig) -> Result<Corpus, RetrievalError> {
    match &config.knowledge.corpus_path {
        Some(path) => Corpus::load(Path::new(path)),
        None => Corpus::sample(),
    }
}

/// Build the retriever selected by `config.knowledge.retriever`.
///
/// The embedding retriever reuses `provider` for its `embed` calls.
pub fn build_from_config(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<Arc<dyn Retriever>, RetrievalError> {
    let corpus = load_corpus(config)?;
    info!(
        retriever = %config.knowledge.retriever,
        passages = corpus.len(),
        "Knowledge base ready"
    );

    match config.knowledge.retriever.as_str() {
        "keyword" => Ok(Arc::new(KeywordRetriever::new(corpus))),
        "embedding" => Ok(Arc::new(EmbeddingRetriever::new(
            corpus,
            provider,
            config.embedding_model.clone(),
        ))),
        other => Err(RetrievalError::Unavailable(format!(
            "Unknown retriever '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragraph_core::error::ProviderError;
    use ragraph_core::provider::{ProviderRequest, ProviderResponse};
    use async_trait::async_trait;

    struct Unused;

    #[async_trait]
    impl Provider for Unused {
        fn name(&self) -> &str {
            "unused"
        }
        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("unused".into()))
        }
    }

    #[test]
    fn default_config_uses_sample_keyword_index() {
        let retriever = build_from_config(&AppConfig::default(), Arc::new(Unused)).unwrap();
        assert_eq!(retriever.name(), "keyword");
    }

    #[test]
    fn embedding_retriever_selected_by_config() {
        let mut config = AppConfig::default();
        config.knowledge.retriever = "embedding".into();
        let retriever = build_from_config(&config, Arc::new(Unused)).unwrap();
        assert_eq!(retriever.name(), "embedding");
    }

    #[test]
    fn missing_corpus_file_fails() {
        let mut config = AppConfig::default();
        config.knowledge.corpus_path = Some("/no/such/corpus.json".into());
        assert!(build_from_config(&config, Arc::new(Unused)).is_err());
    }
}
