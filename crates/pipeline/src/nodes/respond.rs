//! Respond: synthesize a grounded answer from the relevant passages.

use super::NodeContext;
use crate::prompts::{RESPOND_SYSTEM, numbered_context, respond_user};
use crate::state::{Citation, DialogState};
use ragraph_core::error::Result;
use ragraph_core::message::Message;
use tracing::info;

pub async fn run(ctx: &NodeContext, state: &mut DialogState) -> Result<()> {
    let context = numbered_context(&state.retrieved_documents);
    let history = state.prior_history();

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(RESPOND_SYSTEM));
    messages.extend(history.iter().cloned());
    messages.push(Message::user(respond_user(&context, &state.refined_query)));

    let answer = ctx.generate(messages).await?;

    state.citations = state
        .retrieved_documents
        .iter()
        .enumerate()
        .map(|(i, p)| Citation::from_passage(i + 1, p))
        .collect();
    state.push_answer(answer);

    info!(
        conversation_id = %state.conversation_id,
        citations = state.citations.len(),
        "Respond: answer generated"
    );
    Ok(())
}
