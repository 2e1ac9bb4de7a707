//! `ragraph history` / `ragraph forget` — inspect and delete conversations.

use super::load_config;
use ragraph_core::message::ConversationId;

pub async fn show(id: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = ragraph_memory::build_from_config(&config).await?;

    let Some(id) = id else {
        let ids = store.list().await?;
        if ids.is_empty() {
            println!("  No conversations yet ({} store).", store.name());
        } else {
            println!("  Conversations ({} store):", store.name());
            for id in ids {
                println!("    {id}");
            }
        }
        return Ok(());
    };

    let id = ConversationId::from(id);
    let turns = store.get(&id).await?;
    if turns.is_empty() {
        println!("  No turns recorded for {id}.");
        return Ok(());
    }

    println!("  Conversation {id} — {} turns", turns.len());
    println!();
    for turn in &turns {
        println!(
            "  [{}] {:>9} > {}",
            turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
            turn.role.as_str(),
            turn.content
        );
    }
    Ok(())
}

pub async fn forget(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = ragraph_memory::build_from_config(&config).await?;

    if store.delete(&ConversationId::from(id)).await? {
        println!("  Deleted conversation {id}.");
    } else {
        println!("  No conversation named {id}.");
    }
    Ok(())
}
