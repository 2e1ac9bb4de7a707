//! Passage corpus: the pre-chunked documents a retriever searches.
//!
//! Corpora are loaded from a JSON array or a JSON-lines file of
//! `{ "id"?, "source"?, "content" }` records. How the chunks were produced
//! (PDF extraction, splitting) happens upstream.

use ragraph_core::error::RetrievalError;
use ragraph_core::retrieval::Passage;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

const SAMPLE_CORPUS: &str = include_str!("../data/bella_vista.json");

/// One record as written on disk.
#[derive(Debug, Deserialize)]
struct PassageRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    source: Option<String>,
    content: String,
}

/// An ordered, immutable set of passages.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    passages: Vec<Passage>,
}

impl Corpus {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self { passages }
    }

    /// The bundled Bella Vista restaurant corpus used by `demo` and by default.
    pub fn sample() -> Result<Self, RetrievalError> {
        Self::parse_json(SAMPLE_CORPUS, "sample")
    }

    /// Load a corpus file. `.jsonl` files are read line by line; anything
    /// else is parsed as a JSON array.
    pub fn load(path: &Path) -> Result<Self, RetrievalError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Corpus(format!("Failed to read {}: {e}", path.display()))
        })?;
        let origin = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("corpus");

        let corpus = if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
            Self::parse_jsonl(&content, origin)?
        } else {
            Self::parse_json(&content, origin)?
        };

        debug!(path = %path.display(), passages = corpus.len(), "Corpus loaded");
        Ok(corpus)
    }

    fn parse_json(content: &str, origin: &str) -> Result<Self, RetrievalError> {
        let records: Vec<PassageRecord> = serde_json::from_str(content)
            .map_err(|e| RetrievalError::Corpus(format!("Invalid corpus JSON: {e}")))?;
        Ok(Self::from_records(records, origin))
    }

    fn parse_jsonl(content: &str, origin: &str) -> Result<Self, RetrievalError> {
        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PassageRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = line_no + 1, error = %e, "Skipping malformed corpus line"),
            }
        }
        if records.is_empty() && !content.trim().is_empty() {
            return Err(RetrievalError::Corpus("No valid passages in corpus".into()));
        }
        Ok(Self::from_records(records, origin))
    }

    fn from_records(records: Vec<PassageRecord>, origin: &str) -> Self {
        let passages = records
            .into_iter()
            .enumerate()
            .filter(|(_, r)| !r.content.trim().is_empty())
            .map(|(i, r)| {
                let source = r.source.unwrap_or_else(|| origin.to_string());
                Passage {
                    id: r.id.unwrap_or_else(|| format!("{source}#{i}")),
                    content: r.content,
                    source,
                    score: 0.0,
                }
            })
            .collect();
        Self { passages }
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Distinct sources in first-seen order.
    pub fn sources(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for p in &self.passages {
            if !seen.contains(&p.source.as_str()) {
                seen.push(&p.source);
            }
        }
        seen
    }
}
