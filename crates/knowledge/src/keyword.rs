//! Keyword retriever: term-overlap ranking over an in-memory corpus.
//!
//! Needs no embedding service, which makes it the default for local runs
//! and for the bundled sample corpus.

use crate::corpus::Corpus;
use async_trait::async_trait;
use ragraph_core::error::RetrievalError;
use ragraph_core::retrieval::{Passage, Retriever, SearchQuery};
use std::collections::HashSet;
use tracing::debug;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "be", "by", "do", "does", "for", "from", "how", "i", "in",
    "is", "it", "its", "me", "of", "on", "or", "that", "the", "their", "there", "this", "to",
    "was", "what", "when", "where", "which", "who", "why", "with", "you",
];

/// Split text into normalized search terms.
pub(crate) fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| {
            // crude plural folding: "hours" ~ "hour", "opens" ~ "open"
            match w.strip_suffix('s') {
                Some(stem) if stem.len() >= 3 => stem.to_string(),
                _ => w,
            }
        })
        .collect()
}

pub struct KeywordRetriever {
    corpus: Corpus,
    index: Vec<HashSet<String>>,
}

impl KeywordRetriever {
    pub fn new(corpus: Corpus) -> Self {
        let index = corpus.passages().iter().map(|p| terms(&p.content)).collect();
        Self { corpus, index }
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Passage>, RetrievalError> {
        if query.k == 0 {
            return Err(RetrievalError::InvalidQuery("k must be at least 1".into()));
        }

        let wanted = terms(&query.text);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Passage> = self
            .corpus
            .passages()
            .iter()
            .zip(&self.index)
            .filter(|(p, _)| query.admits(&p.source))
            .filter_map(|(p, passage_terms)| {
                let hits = wanted.intersection(passage_terms).count();
                (hits > 0).then(|| Passage {
                    score: hits as f32 / wanted.len() as f32,
                    ..p.clone()
                })
            })
            .collect();

        // Stable sort keeps corpus order among ties
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.k);

        debug!(query = %query.text, hits = scored.len(), "Keyword search complete");
        Ok(scored)
    }
}
