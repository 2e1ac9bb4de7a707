//! Pipeline nodes.
//!
//! Each node is an async function `(&NodeContext, &mut DialogState) -> Result<()>`.
//! Nodes only touch the state and the injected capabilities; which node runs
//! next is decided by [`crate::graph`].

pub mod classify;
pub mod evaluate;
pub mod rephrase;
pub mod respond;
pub mod retrieve;
pub mod terminal;
pub mod tweak;

use crate::grading::{self, Grade};
use crate::graph::NodeKind;
use crate::orchestrator::PipelineSettings;
use crate::state::DialogState;
use ragraph_core::error::Result;
use ragraph_core::message::Message;
use ragraph_core::provider::{Provider, ProviderRequest, ResponseSchema};
use ragraph_core::retrieval::Retriever;
use std::sync::Arc;

/// Capabilities and settings shared by every node of an orchestrator.
pub struct NodeContext {
    pub provider: Arc<dyn Provider>,
    pub retriever: Arc<dyn Retriever>,
    pub settings: PipelineSettings,
}

impl NodeContext {
    pub fn new(
        provider: Arc<dyn Provider>,
        retriever: Arc<dyn Retriever>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            retriever,
            settings,
        }
    }

    /// A request carrying the configured model identity and sampling settings.
    pub fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest::new(&self.settings.model, messages)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
    }

    /// Free-text generation; returns the trimmed answer.
    pub async fn generate(&self, messages: Vec<Message>) -> Result<String> {
        let response = self.provider.complete(self.request(messages)).await?;
        Ok(response.message.content.trim().to_string())
    }

    /// Schema-constrained yes/no generation.
    pub async fn grade(
        &self,
        node: NodeKind,
        schema: ResponseSchema,
        messages: Vec<Message>,
    ) -> Result<Grade> {
        let request = self.request(messages).with_schema(schema);
        let response = self.provider.complete(request).await?;
        grading::decode(node.as_str(), &response.message.content)
    }
}

/// Execute one node against the state.
pub async fn run(node: NodeKind, ctx: &NodeContext, state: &mut DialogState) -> Result<()> {
    match node {
        NodeKind::Rephrase => rephrase::run(ctx, state).await,
        NodeKind::Classify => classify::run(ctx, state).await,
        NodeKind::Retrieve => retrieve::run(ctx, state).await,
        NodeKind::Evaluate => evaluate::run(ctx, state).await,
        NodeKind::Tweak => tweak::run(ctx, state).await,
        NodeKind::Respond => respond::run(ctx, state).await,
        NodeKind::Reject => {
            terminal::reject(state);
            Ok(())
        }
        NodeKind::Fallback => {
            terminal::fallback(state);
            Ok(())
        }
    }
}
