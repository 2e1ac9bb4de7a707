//! Instructions sent to the text-generation capability, and the canned
//! answers of the terminal nodes that never call it.

use ragraph_core::retrieval::Passage;

/// Answer of the Reject node.
pub const REJECT_MESSAGE: &str = "I can't respond to that!";

/// Answer of the Fallback node.
pub const FALLBACK_MESSAGE: &str =
    "I'm sorry, but I couldn't find the information you're looking for.";

pub const REPHRASE_SYSTEM: &str = "You are a helpful assistant that rephrases the user's question \
to be a standalone question optimized for retrieval. Use the conversation so far to resolve \
pronouns and implicit subjects. Reply with the rephrased question only.";

pub const GRADER_SYSTEM: &str = "You are a grader assessing the relevance of a retrieved document \
to a user question. Only answer with 'yes' or 'no'.\n\
If the document contains information relevant to the user's question, respond with 'yes'.\n\
Otherwise, respond with 'no'.";

pub const TWEAK_SYSTEM: &str = "You are a helpful assistant that slightly refines the user's \
question to improve retrieval results. Try synonyms or a broader or narrower phrasing. \
Reply with the adjusted question only.";

pub const RESPOND_SYSTEM: &str = "You answer questions using only the numbered context passages \
and the chat history provided. If the context does not contain the answer, say so. Be concise.";

/// Classifier instruction for the configured topic description.
pub fn classifier_system(topics: &str) -> String {
    format!(
        "You are a classifier that determines whether a user's question is about one of the \
following topics:\n{}\nIf the question IS about any of these topics, respond with 'yes'. \
Otherwise, respond with 'no'.",
        topics.trim()
    )
}

pub fn classifier_user(query: &str) -> String {
    format!("User question: {query}")
}

pub fn grader_user(query: &str, excerpt: &str) -> String {
    format!("User question: {query}\n\nRetrieved document:\n{excerpt}")
}

pub fn tweak_user(query: &str) -> String {
    format!("Original question: {query}")
}

/// Number passages `[1]`, `[2]`, ... with their source.
pub fn numbered_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] From '{}':\n{}", i + 1, p.source, p.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn respond_user(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}
