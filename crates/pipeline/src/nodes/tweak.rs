//! Tweak: rephrase the query for another retrieval attempt.

use super::NodeContext;
use crate::prompts::{TWEAK_SYSTEM, tweak_user};
use crate::state::DialogState;
use ragraph_core::error::Result;
use ragraph_core::message::Message;
use tracing::info;

pub async fn run(ctx: &NodeContext, state: &mut DialogState) -> Result<()> {
    state.refinement_attempts += 1;

    let messages = vec![
        Message::system(TWEAK_SYSTEM),
        Message::user(tweak_user(&state.refined_query)),
    ];
    let adjusted = ctx.generate(messages).await?;
    if !adjusted.is_empty() {
        state.refined_query = adjusted;
    }

    info!(
        conversation_id = %state.conversation_id,
        attempts = state.refinement_attempts,
        refined_query = %state.refined_query,
        "Tweak: query refined"
    );
    Ok(())
}
