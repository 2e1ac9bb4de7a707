//! Retrieve: fetch the top-k passages for the refined query.

use super::NodeContext;
use crate::state::DialogState;
use ragraph_core::error::Result;
use ragraph_core::retrieval::SearchQuery;
use tracing::info;

pub async fn run(ctx: &NodeContext, state: &mut DialogState) -> Result<()> {
    let query = SearchQuery::new(state.refined_query.clone(), ctx.settings.top_k)
        .with_sources(state.sources.clone());

    state.retrieval_calls += 1;
    let passages = ctx.retriever.search(&query).await?;

    info!(
        conversation_id = %state.conversation_id,
        retriever = ctx.retriever.name(),
        query = %query.text,
        hits = passages.len(),
        "Retrieve: passages fetched"
    );

    state.retrieved_documents = passages;
    state.ready_for_response = false;
    Ok(())
}
