//! ThreadClaw CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write a starter config
//! - `run`     — Execute one agent run, streaming to stdout
//! - `history` — Print a thread's messages
//! - `gateway` — Start the HTTP server

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "threadclaw",
    about = "ThreadClaw — streaming agent runtime",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config if none exists
    Onboard,

    /// Run the agent on a message
    Run {
        /// The message to send
        message: String,

        /// Continue an existing thread
        #[arg(short, long)]
        thread: Option<String>,

        /// Agent profile to use
        #[arg(short, long)]
        agent: Option<String>,

        /// Route continuations through the work queue
        #[arg(long)]
        detach: bool,
    },

    /// Print a thread's message history
    History {
        /// The thread to print
        thread_id: String,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Run {
            message,
            thread,
            agent,
            detach,
        } => commands::run::run(message, thread, agent, detach).await?,
        Commands::History { thread_id } => commands::history::run(thread_id).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
    }

    Ok(())
}
