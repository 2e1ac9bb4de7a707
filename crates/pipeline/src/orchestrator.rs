//! Orchestrator: runs one user turn through the graph and commits it.
//!
//! ```text
//! lock(id) → load turns → walk nodes from Rephrase → terminal → commit → unlock
//! ```
//!
//! The deadline covers loading and the walk. An error there, a deadline, or
//! the caller dropping the future leaves the stored conversation untouched.
//! Once the walk has reached a terminal node the commit runs on its own task:
//! it always completes, and its outcome is what the caller gets back.

use crate::graph::{self, NodeKind, Transition};
use crate::locks::ConversationLocks;
use crate::nodes::{self, NodeContext};
use crate::state::{DialogState, Reply};
use chrono::Utc;
use ragraph_config::AppConfig;
use ragraph_core::error::{Error, Result};
use ragraph_core::event::{EventBus, PipelineEvent};
use ragraph_core::memory::ConversationStore;
use ragraph_core::message::{ConversationId, Message};
use ragraph_core::provider::Provider;
use ragraph_core::retrieval::Retriever;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedMutexGuard, broadcast};
use tracing::{debug, info, warn};

/// Tunables for a pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Model identity passed through to the provider
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Tweak → Retrieve cycles allowed before Fallback
    pub max_attempts: u32,
    /// Passages requested per retrieval
    pub top_k: usize,
    /// Deadline for a whole invocation
    pub timeout: Duration,
    /// Relevance judgments in flight at once
    pub evaluate_concurrency: usize,
    /// Passage characters sent to the grader
    pub grading_excerpt_chars: usize,
    /// What the topic gate accepts
    pub topic_description: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            max_attempts: config.pipeline.max_attempts,
            top_k: config.pipeline.top_k,
            timeout: Duration::from_secs(config.pipeline.timeout_secs),
            evaluate_concurrency: config.pipeline.evaluate_concurrency,
            grading_excerpt_chars: config.pipeline.grading_excerpt_chars,
            topic_description: config.topic.description.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        let problem = if self.model.trim().is_empty() {
            Some("model must not be empty")
        } else if self.top_k == 0 {
            Some("top_k must be at least 1")
        } else if self.evaluate_concurrency == 0 {
            Some("evaluate_concurrency must be at least 1")
        } else if self.timeout.is_zero() {
            Some("timeout must be positive")
        } else if self.topic_description.trim().is_empty() {
            Some("topic description must not be empty")
        } else {
            None
        };

        match problem {
            Some(message) => Err(Error::Config {
                message: message.into(),
            }),
            None => Ok(()),
        }
    }
}

/// Assembles an [`Orchestrator`] from injected capabilities.
#[derive(Default)]
pub struct PipelineBuilder {
    provider: Option<Arc<dyn Provider>>,
    retriever: Option<Arc<dyn Retriever>>,
    store: Option<Arc<dyn ConversationStore>>,
    events: Option<Arc<EventBus>>,
    settings: PipelineSettings,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share an event bus; a private one is created otherwise.
    pub fn events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let missing = |what: &str| Error::Config {
            message: format!("pipeline needs a {what}"),
        };
        let provider = self.provider.ok_or_else(|| missing("text-generation provider"))?;
        let retriever = self.retriever.ok_or_else(|| missing("retriever"))?;
        let store = self.store.ok_or_else(|| missing("conversation store"))?;
        self.settings.validate()?;

        Ok(Orchestrator {
            ctx: NodeContext::new(provider, retriever, self.settings),
            store,
            events: self.events.unwrap_or_default(),
            locks: ConversationLocks::new(),
        })
    }
}

/// Entry point for asking questions.
pub struct Orchestrator {
    ctx: NodeContext,
    store: Arc<dyn ConversationStore>,
    events: Arc<EventBus>,
    locks: ConversationLocks,
}

impl Orchestrator {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.ctx.settings
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PipelineEvent>> {
        self.events.subscribe()
    }

    /// Persisted turns of a conversation (empty if unknown).
    pub async fn history(&self, id: &ConversationId) -> Result<Vec<Message>> {
        Ok(self.store.get(id).await?)
    }

    /// Check settings and provider reachability before serving questions.
    ///
    /// Any failure is reported as [`Error::Config`]: an unreachable provider
    /// is a setup problem, not something a retry of the question fixes.
    pub async fn preflight(&self) -> Result<()> {
        self.ctx.settings.validate()?;
        let provider = self.ctx.provider.name().to_string();
        match self.ctx.provider.health_check().await {
            Ok(true) => {
                info!(
                    provider = %provider,
                    retriever = self.ctx.retriever.name(),
                    store = self.store.name(),
                    "Preflight passed"
                );
                Ok(())
            }
            Ok(false) => Err(Error::Config {
                message: format!("provider '{provider}' failed its health check"),
            }),
            Err(e) => Err(Error::Config {
                message: format!("provider '{provider}' is unreachable: {e}"),
            }),
        }
    }

    /// Answer a question and return the caller-facing reply.
    pub async fn ask(&self, question: &str, id: &ConversationId) -> Result<Reply> {
        self.ask_scoped(question, id, Vec::new()).await
    }

    /// Like [`ask`](Self::ask), with retrieval restricted to `sources`.
    pub async fn ask_scoped(
        &self,
        question: &str,
        id: &ConversationId,
        sources: Vec<String>,
    ) -> Result<Reply> {
        let state = self.invoke_scoped(question, id, sources).await?;
        let internal = |what: &str| Error::Internal(format!("invocation ended without {what}"));

        Ok(Reply {
            answer: state.answer().ok_or_else(|| internal("an answer"))?.to_string(),
            outcome: state.outcome().ok_or_else(|| internal("a terminal node"))?,
            conversation_id: state.conversation_id,
            citations: state.citations,
            turns: state.turns,
            refined_query: state.refined_query,
            refinement_attempts: state.refinement_attempts,
        })
    }

    /// Run one invocation and return the final dialog state.
    pub async fn invoke(&self, question: &str, id: &ConversationId) -> Result<DialogState> {
        self.invoke_scoped(question, id, Vec::new()).await
    }

    pub async fn invoke_scoped(
        &self,
        question: &str,
        id: &ConversationId,
        sources: Vec<String>,
    ) -> Result<DialogState> {
        let deadline = self.ctx.settings.timeout;
        let result = match tokio::time::timeout(deadline, self.prepare(question, id, sources)).await
        {
            Ok(Ok((guard, state))) => self.commit(guard, state).await,
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout {
                secs: deadline.as_secs(),
            }),
        };

        if let Err(e) = &result {
            warn!(conversation_id = %id, error = %e, retryable = e.is_retryable(), "Invocation failed");
            self.events.publish(PipelineEvent::InvocationFailed {
                conversation_id: id.to_string(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        result
    }

    /// Lock the conversation, load it and walk the graph to a terminal node.
    async fn prepare(
        &self,
        question: &str,
        id: &ConversationId,
        sources: Vec<String>,
    ) -> Result<(OwnedMutexGuard<()>, DialogState)> {
        let guard = self.locks.acquire(id).await;

        let history = self.store.get(id).await?;
        info!(conversation_id = %id, prior_turns = history.len(), "Invocation started");
        self.events.publish(PipelineEvent::InvocationStarted {
            conversation_id: id.to_string(),
            prior_turns: history.len(),
            timestamp: Utc::now(),
        });

        let state = DialogState::new(id.clone(), history, question).with_sources(sources);
        let state = self.walk(state).await?;
        Ok((guard, state))
    }

    /// Persist the final turns. The write runs on a spawned task that owns
    /// the conversation lock, so dropping the caller cannot interrupt it.
    async fn commit(&self, guard: OwnedMutexGuard<()>, state: DialogState) -> Result<DialogState> {
        let store = self.store.clone();
        let id = state.conversation_id.clone();
        let turns = state.turns.clone();

        tokio::spawn(async move {
            let result = store.put(&id, &turns).await;
            drop(guard);
            result
        })
        .await
        .map_err(|e| Error::Internal(format!("commit task failed: {e}")))??;

        let terminal = state.trace.last().map(NodeKind::as_str).unwrap_or_default();
        info!(
            conversation_id = %state.conversation_id,
            terminal,
            total_turns = state.turns.len(),
            "Turn committed"
        );
        self.events.publish(PipelineEvent::TurnCommitted {
            conversation_id: state.conversation_id.to_string(),
            terminal: terminal.to_string(),
            total_turns: state.turns.len(),
            timestamp: Utc::now(),
        });
        Ok(state)
    }

    async fn walk(&self, mut state: DialogState) -> Result<DialogState> {
        let max_attempts = self.ctx.settings.max_attempts;
        let ceiling = graph::step_ceiling(max_attempts);
        let mut node = NodeKind::START;

        for _ in 0..ceiling {
            debug!(
                conversation_id = %state.conversation_id,
                node = %node,
                attempts = state.refinement_attempts,
                "Entering node"
            );
            self.events.publish(PipelineEvent::NodeEntered {
                conversation_id: state.conversation_id.to_string(),
                node: node.as_str().to_string(),
                refinement_attempts: state.refinement_attempts,
                timestamp: Utc::now(),
            });

            state.trace.push(node);
            nodes::run(node, &self.ctx, &mut state).await?;

            node = match graph::next(node, &state, max_attempts)? {
                Transition::Fixed(next) => next,
                Transition::Routed { router, next } => {
                    self.events.publish(PipelineEvent::RouteDecided {
                        conversation_id: state.conversation_id.to_string(),
                        router: router.to_string(),
                        next: next.as_str().to_string(),
                        timestamp: Utc::now(),
                    });
                    next
                }
                Transition::End => return Ok(state),
            };
        }

        Err(Error::Internal(format!(
            "walk exceeded {ceiling} steps without reaching a terminal node"
        )))
    }
}
