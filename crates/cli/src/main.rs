//! Ragraph CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write a default config and create data directories
//! - `ask`     — Ask one question in a conversation
//! - `chat`    — Interactive conversation
//! - `demo`    — Run the three Bella Vista scenarios
//! - `history` — List conversations or show one
//! - `forget`  — Delete a conversation
//! - `doctor`  — Diagnose configuration and capabilities

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ragraph",
    about = "Ragraph — conversational, self-correcting retrieval",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and data directories
    Onboard,

    /// Ask a single question
    Ask {
        /// Conversation to continue (a new one is started otherwise)
        #[arg(short, long)]
        conversation: Option<String>,

        /// Only retrieve from these sources (repeatable)
        #[arg(short, long = "source")]
        sources: Vec<String>,

        /// Print the full reply as JSON
        #[arg(long)]
        json: bool,

        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Chat interactively
    Chat {
        /// Conversation to continue (a new one is started otherwise)
        #[arg(short, long)]
        conversation: Option<String>,
    },

    /// Run the demonstration scenarios against the bundled sample corpus
    Demo,

    /// Show a conversation's turns, or list conversations
    History {
        /// Conversation to show
        id: Option<String>,
    },

    /// Delete a conversation
    Forget {
        /// Conversation to delete
        id: String,
    },

    /// Diagnose configuration and capabilities
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Ask {
            conversation,
            sources,
            json,
            question,
        } => commands::ask::run(conversation, sources, json, question.join(" ")).await?,
        Commands::Chat { conversation } => commands::chat::run(conversation).await?,
        Commands::Demo => commands::demo::run().await?,
        Commands::History { id } => commands::history::show(id).await?,
        Commands::Forget { id } => commands::history::forget(&id).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
