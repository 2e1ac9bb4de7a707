//! `ragraph chat` — interactive conversation.

use super::{
    GENERIC_FAILURE, build_orchestrator, ensure_ready, is_fatal, load_config, print_reply,
    require_api_key,
};
use ragraph_core::message::ConversationId;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: &[&str] = &["quit", "exit", "q"];

pub async fn run(conversation: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    require_api_key(&config)?;
    let orchestrator = build_orchestrator(&config).await?;
    ensure_ready(&orchestrator).await?;

    let id = conversation.map(ConversationId::from).unwrap_or_default();
    let prior = orchestrator.history(&id).await?.len();

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Ragraph — Interactive Mode            ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:      {}", config.default_provider);
    println!("  Model:         {}", config.default_model);
    println!("  Retriever:     {}", config.knowledge.retriever);
    println!("  Memory:        {}", orchestrator.store().name());
    println!("  Conversation:  {id} ({prior} prior turns)");
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'quit', 'exit' or 'q' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }

        eprint!("  ...");
        let result = orchestrator.ask(question, &id).await;
        eprint!("\r     \r");

        match result {
            Ok(reply) => {
                println!();
                print_reply(&reply);
                println!();
            }
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => {
                tracing::debug!(error = %e, "chat turn failed");
                eprintln!("  {GENERIC_FAILURE}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye! Conversation saved as {id}");
    println!();
    Ok(())
}
