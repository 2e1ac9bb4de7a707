//! `ragraph ask` — single question mode.

use super::{
    GENERIC_FAILURE, build_orchestrator, ensure_ready, is_fatal, load_config, print_reply,
    require_api_key,
};
use ragraph_core::message::ConversationId;
use tracing::debug;

pub async fn run(
    conversation: Option<String>,
    sources: Vec<String>,
    json: bool,
    question: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let question = question.trim();
    if question.is_empty() {
        return Err("Question must not be empty".into());
    }

    let config = load_config()?;
    require_api_key(&config)?;
    let orchestrator = build_orchestrator(&config).await?;
    ensure_ready(&orchestrator).await?;

    let id = conversation.map(ConversationId::from).unwrap_or_default();

    eprint!("  Thinking...");
    let result = orchestrator.ask_scoped(question, &id, sources).await;
    eprint!("\r              \r");

    match result {
        Ok(reply) if json => {
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(())
        }
        Ok(reply) => {
            print_reply(&reply);
            eprintln!();
            eprintln!("  conversation: {id}");
            Ok(())
        }
        Err(e) if is_fatal(&e) => Err(e.into()),
        Err(e) => {
            debug!(error = %e, "ask failed");
            Err(GENERIC_FAILURE.into())
        }
    }
}
