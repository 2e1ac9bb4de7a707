//! Binary grades returned by schema-constrained model calls.
//!
//! Both the topic classifier and the relevance grader answer with
//! `{"score": "yes" | "no"}`. The provider is asked to honor the JSON
//! schema; the text it returns is still decoded here and anything outside
//! the two values is rejected as a schema violation.

use ragraph_core::error::{Error, Result};
use ragraph_core::provider::ResponseSchema;
use serde::{Deserialize, Serialize};

pub const TOPIC_SCHEMA_NAME: &str = "topic_grade";
pub const RELEVANCE_SCHEMA_NAME: &str = "relevance_grade";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    #[serde(alias = "Yes", alias = "YES")]
    Yes,
    #[serde(alias = "No", alias = "NO")]
    No,
}

impl Grade {
    pub fn is_yes(self) -> bool {
        self == Grade::Yes
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GradeEnvelope {
    score: Grade,
}

fn schema(name: &str, description: &str) -> ResponseSchema {
    ResponseSchema {
        name: name.to_string(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "score": {
                    "type": "string",
                    "enum": ["yes", "no"],
                    "description": description,
                }
            },
            "required": ["score"],
            "additionalProperties": false,
        }),
    }
}

/// Schema for the on/off-topic classifier.
pub fn topic_schema() -> ResponseSchema {
    schema(
        TOPIC_SCHEMA_NAME,
        "'yes' if the question is about one of the supported topics, otherwise 'no'",
    )
}

/// Schema for the per-passage relevance grader.
pub fn relevance_schema() -> ResponseSchema {
    schema(
        RELEVANCE_SCHEMA_NAME,
        "'yes' if the document is relevant to the question, otherwise 'no'",
    )
}

/// Decode a model answer into a [`Grade`].
pub fn decode(node: &str, raw: &str) -> Result<Grade> {
    serde_json::from_str::<GradeEnvelope>(raw.trim())
        .map(|envelope| envelope.score)
        .map_err(|e| Error::SchemaViolation {
            node: node.to_string(),
            reason: format!("expected {{\"score\": \"yes\" | \"no\"}}, got {raw:?} ({e})"),
        })
}
