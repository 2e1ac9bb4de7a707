//! Shared test helpers for pipeline tests.

use crate::grading::{RELEVANCE_SCHEMA_NAME, TOPIC_SCHEMA_NAME};
use crate::nodes::NodeContext;
use crate::orchestrator::PipelineSettings;
use crate::prompts;
use async_trait::async_trait;
use ragraph_core::error::{ProviderError, RetrievalError};
use ragraph_core::message::Message;
use ragraph_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use ragraph_core::retrieval::{Passage, Retriever, SearchQuery};
use std::sync::{Arc, Mutex};

/// Which node issued a provider request, recognized by schema or instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Rephrase,
    Classify,
    Grade,
    Tweak,
    Respond,
    Unknown,
}

impl Call {
    pub fn of(request: &ProviderRequest) -> Self {
        if let Some(schema) = &request.response_schema {
            return match schema.name.as_str() {
                TOPIC_SCHEMA_NAME => Call::Classify,
                RELEVANCE_SCHEMA_NAME => Call::Grade,
                _ => Call::Unknown,
            };
        }
        match request.system_prompt() {
            Some(prompts::REPHRASE_SYSTEM) => Call::Rephrase,
            Some(prompts::TWEAK_SYSTEM) => Call::Tweak,
            Some(prompts::RESPOND_SYSTEM) => Call::Respond,
            _ => Call::Unknown,
        }
    }
}

type Script = Box<dyn Fn(Call, &ProviderRequest) -> Result<String, ProviderError> + Send + Sync>;

/// A provider whose answers come from a closure over (call kind, request).
///
/// Every request is recorded for later inspection.
pub struct ScriptedProvider {
    script: Script,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(
        script: impl Fn(Call, &ProviderRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// On-topic, every passage relevant, fixed rewrite and answer.
    pub fn agreeable(answer: &'static str) -> Self {
        Self::new(move |call, _| {
            Ok(match call {
                Call::Classify | Call::Grade => yes(),
                Call::Rephrase | Call::Tweak => "rewritten question".into(),
                Call::Respond => answer.into(),
                Call::Unknown => String::new(),
            })
        })
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.requests().iter().map(Call::of).collect()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let text = (self.script)(Call::of(&request), &request)?;
        Ok(make_text_response(&text))
    }
}

pub fn yes() -> String {
    r#"{"score":"yes"}"#.into()
}

pub fn no() -> String {
    r#"{"score":"no"}"#.into()
}

pub fn make_text_response(text: &str) -> ProviderResponse {
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

/// A retriever returning a fixed passage list and recording queries.
pub struct StubRetriever {
    passages: Vec<Passage>,
    queries: Mutex<Vec<SearchQuery>>,
    failure: Option<RetrievalError>,
}

impl StubRetriever {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            queries: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    pub fn failing(error: RetrievalError) -> Self {
        Self {
            passages: Vec::new(),
            queries: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl Retriever for StubRetriever {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Passage>, RetrievalError> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        Ok(self
            .passages
            .iter()
            .filter(|p| query.admits(&p.source))
            .take(query.k)
            .cloned()
            .collect())
    }
}

pub fn passage(id: &str, source: &str, content: &str) -> Passage {
    Passage {
        id: id.into(),
        content: content.into(),
        source: source.into(),
        score: 1.0,
    }
}

/// Two Bella Vista passages: opening hours first, owner second.
pub fn bella_vista() -> Vec<Passage> {
    vec![
        passage(
            "restaurant_info.txt#0",
            "restaurant_info.txt",
            "Bella Vista is open from Monday to Sunday. Weekday hours are 11:00 AM to 10:00 PM, while weekend hours are extended from 11:00 AM to 11:00 PM.",
        ),
        passage(
            "owner.txt#0",
            "owner.txt",
            "Bella Vista is owned by Antonio Rossi, a renowned chef with over 20 years of experience in the culinary industry.",
        ),
    ]
}

pub fn context(provider: Arc<dyn Provider>, retriever: Arc<dyn Retriever>) -> NodeContext {
    NodeContext::new(provider, retriever, PipelineSettings::default())
}
