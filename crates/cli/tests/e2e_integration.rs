//! End-to-end tests for the Ragraph pipeline.
//!
//! These wire the real retriever (keyword search over the bundled Bella Vista
//! corpus) and real conversation stores to a scripted text-generation
//! provider, then drive whole conversations through the orchestrator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ragraph_core::error::{Error, ProviderError, RetrievalError};
use ragraph_core::memory::ConversationStore;
use ragraph_core::message::{ConversationId, Message, Role};
use ragraph_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use ragraph_core::retrieval::{Passage, Retriever, SearchQuery};
use ragraph_knowledge::{Corpus, KeywordRetriever};
use ragraph_memory::{FileStore, InMemoryStore, SqliteStore};
use ragraph_pipeline::grading::{RELEVANCE_SCHEMA_NAME, TOPIC_SCHEMA_NAME};
use ragraph_pipeline::prompts::{self, FALLBACK_MESSAGE, REJECT_MESSAGE};
use ragraph_pipeline::{NodeKind, Orchestrator, Outcome, PipelineSettings};
use tempfile::TempDir;

// ── Scripted Provider ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Rephrase,
    Classify,
    Grade,
    Tweak,
    Respond,
    Other,
}

fn call_of(request: &ProviderRequest) -> Call {
    match request.response_schema.as_ref().map(|s| s.name.as_str()) {
        Some(TOPIC_SCHEMA_NAME) => return Call::Classify,
        Some(RELEVANCE_SCHEMA_NAME) => return Call::Grade,
        Some(_) => return Call::Other,
        None => {}
    }
    match request.system_prompt() {
        Some(prompts::REPHRASE_SYSTEM) => Call::Rephrase,
        Some(prompts::TWEAK_SYSTEM) => Call::Tweak,
        Some(prompts::RESPOND_SYSTEM) => Call::Respond,
        _ => Call::Other,
    }
}

type Script = dyn Fn(Call, &ProviderRequest) -> Result<String, ProviderError> + Send + Sync;

/// A provider that answers through a script and records every request.
struct ScriptedProvider {
    script: Box<Script>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(
        script: impl Fn(Call, &ProviderRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A well-behaved model for the Bella Vista topics.
    ///
    /// Grades a passage relevant when it mentions `keyword`.
    fn bella_vista(keyword: &'static str) -> Self {
        Self::new(move |call, request| {
            let last = request.messages.last().map(|m| m.content.as_str()).unwrap_or("");
            Ok(match call {
                Call::Classify => {
                    if last.contains("weather") {
                        no()
                    } else {
                        yes()
                    }
                }
                Call::Grade => {
                    let document = last.split("Retrieved document:").nth(1).unwrap_or("");
                    if document.to_lowercase().contains(keyword) {
                        yes()
                    } else {
                        no()
                    }
                }
                Call::Rephrase => "Is Bella Vista open on Sunday?".into(),
                Call::Tweak => format!("{} (rephrased)", last.trim_start_matches("Original question: ")),
                Call::Respond => "Bella Vista opens at 11:00 AM every day.".into(),
                Call::Other => String::new(),
            })
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn count(&self, call: Call) -> usize {
        self.requests().iter().filter(|r| call_of(r) == call).count()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let text = (self.script)(call_of(&request), &request)?;
        Ok(text_response(&text))
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

fn yes() -> String {
    r#"{"score":"yes"}"#.into()
}

fn no() -> String {
    r#"{"score":"no"}"#.into()
}

// ── Counting Retriever ───────────────────────────────────────────────────

/// Wraps a retriever and counts searches.
struct CountingRetriever {
    inner: Arc<dyn Retriever>,
    queries: Mutex<Vec<String>>,
}

impl CountingRetriever {
    fn sample() -> Self {
        let corpus = Corpus::sample().expect("bundled corpus");
        Self {
            inner: Arc::new(KeywordRetriever::new(corpus)),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl Retriever for CountingRetriever {
    fn name(&self) -> &str {
        "counting"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Passage>, RetrievalError> {
        self.queries.lock().unwrap().push(query.text.clone());
        self.inner.search(query).await
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

fn pipeline(
    provider: Arc<dyn Provider>,
    retriever: Arc<dyn Retriever>,
    store: Arc<dyn ConversationStore>,
    settings: PipelineSettings,
) -> Orchestrator {
    Orchestrator::builder()
        .provider(provider)
        .retriever(retriever)
        .store(store)
        .settings(settings)
        .build()
        .expect("pipeline builds")
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_off_topic_is_rejected_without_retrieval() {
    let provider = Arc::new(ScriptedProvider::bella_vista("hours"));
    let retriever = Arc::new(CountingRetriever::sample());
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = pipeline(
        provider.clone(),
        retriever.clone(),
        store.clone(),
        PipelineSettings::default(),
    );

    let id = ConversationId::from("1");
    let reply = orchestrator.ask("How is the weather?", &id).await.unwrap();

    assert_eq!(reply.answer, REJECT_MESSAGE);
    assert_eq!(reply.outcome, Outcome::Rejected);
    assert_eq!(retriever.calls(), 0);
    assert_eq!(provider.count(Call::Classify), 1);
    assert_eq!(provider.count(Call::Grade), 0);
    assert_eq!(store.get(&id).await.unwrap(), reply.turns);
}

#[tokio::test]
async fn scenario_b_unanswerable_question_falls_back_after_two_refinements() {
    // Nothing in the corpus mentions an age
    let provider = Arc::new(ScriptedProvider::bella_vista("years old"));
    let retriever = Arc::new(CountingRetriever::sample());
    let orchestrator = pipeline(
        provider.clone(),
        retriever.clone(),
        Arc::new(InMemoryStore::new()),
        PipelineSettings::default(),
    );

    let state = orchestrator
        .invoke(
            "How old is the owner of the restaurant Bella Vista?",
            &"2".into(),
        )
        .await
        .unwrap();

    assert_eq!(state.answer(), Some(FALLBACK_MESSAGE));
    assert_eq!(state.refinement_attempts, 2);
    assert_eq!(state.retrieval_calls, 3);
    assert_eq!(retriever.calls(), 3);
    assert_eq!(provider.count(Call::Tweak), 2);
    assert!(state.citations.is_empty());
    assert_eq!(
        state.trace,
        vec![
            NodeKind::Rephrase,
            NodeKind::Classify,
            NodeKind::Retrieve,
            NodeKind::Evaluate,
            NodeKind::Tweak,
            NodeKind::Retrieve,
            NodeKind::Evaluate,
            NodeKind::Tweak,
            NodeKind::Retrieve,
            NodeKind::Evaluate,
            NodeKind::Fallback,
        ]
    );
}

#[tokio::test]
async fn scenario_c_follow_up_is_rephrased_from_history() {
    let tmp = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::bella_vista("hours"));
    let retriever = Arc::new(CountingRetriever::sample());
    let store = Arc::new(FileStore::new(tmp.path()));
    let orchestrator = pipeline(
        provider.clone(),
        retriever.clone(),
        store.clone(),
        PipelineSettings::default(),
    );
    let id = ConversationId::from("3");

    let first = orchestrator.ask("When does Bella Vista open?", &id).await.unwrap();
    assert_eq!(first.outcome, Outcome::Answered);
    assert_eq!(first.refined_query, "When does Bella Vista open?");
    assert!(!first.citations.is_empty());
    assert!(first.citations.iter().all(|c| c.source == "restaurant_info.txt"));
    assert_eq!(provider.count(Call::Rephrase), 0);

    let second = orchestrator.ask("Also on Sunday?", &id).await.unwrap();
    assert_eq!(second.outcome, Outcome::Answered);
    assert_eq!(second.refined_query, "Is Bella Vista open on Sunday?");

    // The rephrase request carried both earlier turns
    let rephrase = provider
        .requests()
        .into_iter()
        .find(|r| call_of(r) == Call::Rephrase)
        .unwrap();
    let history: Vec<_> = rephrase.messages[1..rephrase.messages.len() - 1].to_vec();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "When does Bella Vista open?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(rephrase.messages.last().unwrap().content, "Also on Sunday?");

    let stored = store.get(&id).await.unwrap();
    assert_eq!(stored.len(), 4);
    assert_eq!(stored, second.turns);
}

// ── Memory Properties ────────────────────────────────────────────────────

#[tokio::test]
async fn history_is_append_only_across_invocations() {
    let provider = Arc::new(ScriptedProvider::bella_vista("hours"));
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = pipeline(
        provider,
        Arc::new(CountingRetriever::sample()),
        store.clone(),
        PipelineSettings::default(),
    );
    let id = ConversationId::from("append");

    let mut previous: Vec<Message> = Vec::new();
    for question in ["When does Bella Vista open?", "How is the weather?", "Also on Sunday?"] {
        let reply = orchestrator.ask(question, &id).await.unwrap();
        assert_eq!(reply.turns.len(), previous.len() + 2);
        assert_eq!(&reply.turns[..previous.len()], previous.as_slice());
        assert_eq!(reply.turns[previous.len()].content, question);
        previous = store.get(&id).await.unwrap();
        assert_eq!(previous, reply.turns);
    }
}

#[tokio::test]
async fn schema_violation_leaves_file_store_untouched() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(tmp.path()));
    let id = ConversationId::from("broken");
    let baseline = vec![
        Message::user("When does Bella Vista open?"),
        Message::assistant("At 11:00 AM."),
    ];
    store.put(&id, &baseline).await.unwrap();

    let provider = Arc::new(ScriptedProvider::new(|call, _| {
        Ok(match call {
            Call::Rephrase => "Is Bella Vista open on Sunday?".into(),
            Call::Classify => "Yes! Definitely on topic.".into(),
            _ => String::new(),
        })
    }));
    let orchestrator = pipeline(
        provider,
        Arc::new(CountingRetriever::sample()),
        store.clone(),
        PipelineSettings::default(),
    );

    let err = orchestrator.ask("Also on Sunday?", &id).await.unwrap_err();
    assert!(matches!(err, Error::SchemaViolation { .. }));
    assert_eq!(store.get(&id).await.unwrap(), baseline);
}

#[tokio::test]
async fn transient_failure_leaves_history_untouched() {
    let store = Arc::new(InMemoryStore::new());
    let id = ConversationId::from("flaky");
    let provider = Arc::new(ScriptedProvider::new(|call, _| match call {
        Call::Classify => Ok(yes()),
        Call::Grade => Err(ProviderError::RateLimited {
            retry_after_secs: 5,
        }),
        _ => Ok(String::new()),
    }));
    let orchestrator = pipeline(
        provider,
        Arc::new(CountingRetriever::sample()),
        store.clone(),
        PipelineSettings::default(),
    );

    let err = orchestrator.ask("When does Bella Vista open?", &id).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(store.get(&id).await.unwrap().is_empty());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timeout_leaves_history_untouched() {
    struct Slow;

    #[async_trait]
    impl Provider for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(text_response(r#"{"score":"yes"}"#))
        }
    }

    let store = Arc::new(InMemoryStore::new());
    let orchestrator = pipeline(
        Arc::new(Slow),
        Arc::new(CountingRetriever::sample()),
        store.clone(),
        PipelineSettings {
            timeout: Duration::from_secs(30),
            ..PipelineSettings::default()
        },
    );

    let id = ConversationId::from("slow");
    let err = orchestrator.ask("When does Bella Vista open?", &id).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { secs: 30 }));
    assert!(store.get(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_turns_on_one_conversation_are_serialized() {
    let tmp = TempDir::new().unwrap();
    let url = format!("sqlite://{}", tmp.path().join("turns.sqlite").display());
    let store = Arc::new(SqliteStore::new(&url).await.unwrap());
    let orchestrator = Arc::new(pipeline(
        Arc::new(ScriptedProvider::bella_vista("hours")),
        Arc::new(CountingRetriever::sample()),
        store.clone(),
        PipelineSettings::default(),
    ));
    let id = ConversationId::from("shared");

    let handles: Vec<_> = ["When does Bella Vista open?", "Who owns Bella Vista?"]
        .into_iter()
        .map(|question| {
            let orchestrator = orchestrator.clone();
            let id = id.clone();
            tokio::spawn(async move { orchestrator.ask(question, &id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let turns = store.get(&id).await.unwrap();
    assert_eq!(turns.len(), 4);
    let roles: Vec<_> = turns.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn distinct_conversations_do_not_share_history() {
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = pipeline(
        Arc::new(ScriptedProvider::bella_vista("hours")),
        Arc::new(CountingRetriever::sample()),
        store.clone(),
        PipelineSettings::default(),
    );

    orchestrator.ask("When does Bella Vista open?", &"a".into()).await.unwrap();
    let other = orchestrator.ask("How is the weather?", &"b".into()).await.unwrap();

    assert_eq!(other.turns.len(), 2);
    assert_eq!(
        store.list().await.unwrap(),
        vec![ConversationId::from("a"), ConversationId::from("b")]
    );
}

// ── Evaluate Ordering ────────────────────────────────────────────────────

/// Grades every passage relevant, answering later passages first.
struct ReverseLatencyGrader {
    respond_prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Provider for ReverseLatencyGrader {
    fn name(&self) -> &str {
        "reverse-latency"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        match call_of(&request) {
            Call::Classify => Ok(text_response(&yes())),
            Call::Grade => {
                // The owner passage is slowest, the menu passage fastest
                let delay = if last.contains("Antonio Rossi") {
                    300
                } else if last.contains("weekend hours") {
                    200
                } else {
                    10
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(text_response(&yes()))
            }
            Call::Respond => {
                self.respond_prompts.lock().unwrap().push(last);
                Ok(text_response("Here is what I found."))
            }
            _ => Ok(text_response("")),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn evaluate_keeps_retrieval_order_when_later_grades_finish_first() {
    let corpus = Corpus::sample().unwrap();
    let retriever = Arc::new(KeywordRetriever::new(corpus));
    let query = "Bella Vista owner hours menu";
    let expected: Vec<String> = retriever
        .search(&SearchQuery::new(query, 4))
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();

    let provider = Arc::new(ReverseLatencyGrader {
        respond_prompts: Mutex::new(Vec::new()),
    });
    let orchestrator = pipeline(
        provider.clone(),
        retriever,
        Arc::new(InMemoryStore::new()),
        PipelineSettings {
            top_k: 4,
            ..PipelineSettings::default()
        },
    );

    let reply = orchestrator.ask(query, &"order".into()).await.unwrap();

    let cited: Vec<String> = reply.citations.iter().map(|c| c.passage_id.clone()).collect();
    assert_eq!(cited, expected);
    let indices: Vec<usize> = reply.citations.iter().map(|c| c.index).collect();
    assert_eq!(indices, (1..=expected.len()).collect::<Vec<_>>());
    assert_eq!(provider.respond_prompts.lock().unwrap().len(), 1);
}
