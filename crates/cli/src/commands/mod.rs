pub mod ask;
pub mod chat;
pub mod demo;
pub mod doctor;
pub mod history;
pub mod onboard;

use ragraph_config::AppConfig;
use ragraph_core::error::Error;
use ragraph_core::event::EventBus;
use ragraph_core::retrieval::Retriever;
use ragraph_pipeline::{Orchestrator, PipelineSettings, Reply};
use std::sync::Arc;

/// Shown instead of internal error details when an invocation fails.
pub const GENERIC_FAILURE: &str = "Sorry, I couldn't process your question. Please try again.";

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Fail early with setup instructions when no API key is available.
pub fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let has_provider_key = config.providers.values().any(|p| p.api_key.is_some());
    if config.has_api_key() || has_provider_key || config.default_provider == "ollama" {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    OPENAI_API_KEY      = 'sk-...'        (OpenAI)");
    eprintln!("    OPENROUTER_API_KEY  = 'sk-or-v1-...'  (OpenRouter)");
    eprintln!("    RAGRAPH_API_KEY     = '...'           (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}

/// Wire provider, retriever and store from config into an orchestrator.
pub async fn build_orchestrator(
    config: &AppConfig,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let store = ragraph_memory::build_from_config(config).await?;
    orchestrator_with_store(config, store, None)
}

/// Same as [`build_orchestrator`] but with an explicit store and retriever.
pub fn orchestrator_with_store(
    config: &AppConfig,
    store: Arc<dyn ragraph_core::memory::ConversationStore>,
    retriever: Option<Arc<dyn Retriever>>,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let router = ragraph_providers::build_from_config(config);
    let provider = router.primary().ok_or("No default provider configured")?;
    let retriever = match retriever {
        Some(r) => r,
        None => ragraph_knowledge::build_from_config(config, provider.clone())?,
    };

    Ok(Orchestrator::builder()
        .provider(provider)
        .retriever(retriever)
        .store(store)
        .events(Arc::new(EventBus::default()))
        .settings(PipelineSettings::from_config(config))
        .build()?)
}

/// Refuse to serve questions when the provider is unusable.
pub async fn ensure_ready(orchestrator: &Orchestrator) -> Result<(), Box<dyn std::error::Error>> {
    orchestrator
        .preflight()
        .await
        .map_err(|e| format!("{e}. Run `ragraph doctor` for details.").into())
}

/// Configuration problems end the command; retrying the question won't help.
pub fn is_fatal(error: &Error) -> bool {
    matches!(error, Error::Config { .. })
}

/// Print an answer and its citations.
pub fn print_reply(reply: &Reply) {
    for line in reply.answer.lines() {
        println!("  Assistant > {line}");
    }
    if !reply.citations.is_empty() {
        println!();
        for c in &reply.citations {
            println!("    [{}] {} ({}, score {:.2})", c.index, c.source, c.passage_id, c.score);
        }
    }
}
