//! `ragraph demo` — the three Bella Vista scenarios.
//!
//! Uses the configured provider, but always the bundled sample corpus and a
//! throwaway in-memory store so the demo never touches saved conversations.

use super::{
    GENERIC_FAILURE, ensure_ready, is_fatal, load_config, orchestrator_with_store, print_reply,
    require_api_key,
};
use ragraph_core::message::ConversationId;
use ragraph_core::retrieval::Retriever;
use ragraph_knowledge::{Corpus, KeywordRetriever};
use ragraph_memory::InMemoryStore;
use ragraph_pipeline::Orchestrator;
use std::sync::Arc;

struct Scenario {
    title: &'static str,
    conversation: &'static str,
    questions: &'static [&'static str],
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        title: "Out-of-scope question",
        conversation: "demo-1",
        questions: &["How is the weather?"],
    },
    Scenario {
        title: "Question with no available answer",
        conversation: "demo-2",
        questions: &["How old is the owner of the restaurant Bella Vista?"],
    },
    Scenario {
        title: "Conversation with a follow-up",
        conversation: "demo-3",
        questions: &["When does Bella Vista open?", "Also on Sunday?"],
    },
];

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    require_api_key(&config)?;

    let retriever: Arc<dyn Retriever> = Arc::new(KeywordRetriever::new(Corpus::sample()?));
    let orchestrator = orchestrator_with_store(
        &config,
        Arc::new(InMemoryStore::new()),
        Some(retriever),
    )?;
    ensure_ready(&orchestrator).await?;

    println!();
    println!("  Ragraph demo — Bella Vista sample corpus");
    println!("  ========================================");

    for (i, scenario) in SCENARIOS.iter().enumerate() {
        println!();
        println!("  Scenario {}: {}", i + 1, scenario.title);
        println!("  {}", "-".repeat(40));
        run_scenario(&orchestrator, scenario).await?;
    }

    println!();
    Ok(())
}

async fn run_scenario(
    orchestrator: &Orchestrator,
    scenario: &Scenario,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ConversationId::from(scenario.conversation);
    for question in scenario.questions {
        println!("  You > {question}");
        match orchestrator.ask(question, &id).await {
            Ok(reply) => {
                print_reply(&reply);
                println!(
                    "    (outcome: {:?}, refined query: {:?}, attempts: {})",
                    reply.outcome, reply.refined_query, reply.refinement_attempts
                );
            }
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => {
                tracing::debug!(error = %e, "demo question failed");
                eprintln!("  {GENERIC_FAILURE}");
            }
        }
    }
    Ok(())
}
