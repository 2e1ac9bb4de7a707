//! Reject and Fallback: terminal nodes with canned answers.

use crate::prompts::{FALLBACK_MESSAGE, REJECT_MESSAGE};
use crate::state::DialogState;
use tracing::info;

/// The question is outside the supported topics.
pub fn reject(state: &mut DialogState) {
    state.citations.clear();
    state.push_answer(REJECT_MESSAGE);
    info!(conversation_id = %state.conversation_id, "Reject: off-topic question");
}

/// Refinement ran out without finding relevant passages.
pub fn fallback(state: &mut DialogState) {
    state.citations.clear();
    state.push_answer(FALLBACK_MESSAGE);
    info!(
        conversation_id = %state.conversation_id,
        attempts = state.refinement_attempts,
        "Fallback: no relevant passages found"
    );
}
