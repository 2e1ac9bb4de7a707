//! Dialog state: the record threaded through every node of one invocation.

use crate::graph::NodeKind;
use ragraph_core::message::{ConversationId, Message};
use ragraph_core::retrieval::Passage;
use serde::{Deserialize, Serialize};

/// Characters of passage text shown in a citation preview.
pub const CITATION_PREVIEW_CHARS: usize = 200;

/// Verdict of the topic classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicFlag {
    OnTopic,
    OffTopic,
}

/// Which terminal node produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Respond synthesized an answer from relevant passages
    Answered,
    /// Reject: the question is outside the supported topics
    Rejected,
    /// Fallback: refinement attempts ran out without relevant passages
    NotFound,
}

/// A passage the answer was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based number used as `[n]` in the answer context
    pub index: usize,
    pub passage_id: String,
    pub source: String,
    pub score: f32,
    pub preview: String,
}

impl Citation {
    pub fn from_passage(index: usize, passage: &Passage) -> Self {
        let mut preview: String = passage.content.chars().take(CITATION_PREVIEW_CHARS).collect();
        if passage.content.chars().count() > CITATION_PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self {
            index,
            passage_id: passage.id.clone(),
            source: passage.source.clone(),
            score: passage.score,
            preview,
        }
    }
}

/// Mutable state of a single invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogState {
    pub conversation_id: ConversationId,

    /// Persisted history plus this invocation's user turn (and, once a
    /// terminal node ran, its assistant turn). Append-only.
    pub turns: Vec<Message>,

    /// The raw incoming question
    pub current_question: String,

    /// Standalone query used for classification and retrieval
    pub refined_query: String,

    /// Unset until Classify runs
    pub topic_flag: Option<TopicFlag>,

    pub retrieved_documents: Vec<Passage>,
    pub ready_for_response: bool,
    pub refinement_attempts: u32,

    /// Restrict retrieval to these sources (empty = everything)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Filled by Respond
    #[serde(default)]
    pub citations: Vec<Citation>,

    /// Number of Retrieve executions
    #[serde(default)]
    pub retrieval_calls: u32,

    /// Nodes visited, in order
    #[serde(default)]
    pub trace: Vec<NodeKind>,
}

impl DialogState {
    /// Build the initial state from persisted history and the new question.
    pub fn new(
        conversation_id: ConversationId,
        history: Vec<Message>,
        question: impl Into<String>,
    ) -> Self {
        let question = question.into();
        let mut turns = history;
        turns.push(Message::user(question.clone()));

        Self {
            conversation_id,
            turns,
            refined_query: question.clone(),
            current_question: question,
            topic_flag: None,
            retrieved_documents: Vec::new(),
            ready_for_response: false,
            refinement_attempts: 0,
            sources: Vec::new(),
            citations: Vec::new(),
            retrieval_calls: 0,
            trace: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Turns that precede the current question.
    pub fn prior_history(&self) -> &[Message] {
        let end = self.turns.len().saturating_sub(1);
        &self.turns[..end]
    }

    /// Append the assistant turn produced by a terminal node.
    pub fn push_answer(&mut self, content: impl Into<String>) {
        self.turns.push(Message::assistant(content));
    }

    /// The assistant answer, once a terminal node has run.
    pub fn answer(&self) -> Option<&str> {
        self.turns
            .last()
            .filter(|m| m.is_assistant())
            .map(|m| m.content.as_str())
    }

    /// The terminal node reached, if any.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.trace.last()? {
            NodeKind::Respond => Some(Outcome::Answered),
            NodeKind::Reject => Some(Outcome::Rejected),
            NodeKind::Fallback => Some(Outcome::NotFound),
            _ => None,
        }
    }
}

/// What the caller gets back from `Orchestrator::ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub conversation_id: ConversationId,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub turns: Vec<Message>,
    pub refined_query: String,
    pub outcome: Outcome,
    pub refinement_attempts: u32,
}
