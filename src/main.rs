//! # SkillWise backend CLI (`skillwise`)
//!
//! ## Usage
//!
//! ```bash
//! skillwise --config ./config/skillwise.toml serve
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `skillwise serve` | Start the HTTP server |
//! | `skillwise token <owner>` | Mint a development bearer token for `owner` |
//!
//! The server expects two secrets in the environment: the completion-service
//! API key (variable named by `completion.api_key_env`, default
//! `OPENROUTER_API_KEY`) and the token-signing secret (named by
//! `auth.secret_env`, default `SKILLWISE_AUTH_SECRET`). Neither ever
//! appears in the config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use skillwise::auth::TokenVerifier;
use skillwise::config::load_config;
use skillwise::server::run_server;

/// SkillWise backend — document Q&A, quiz generation, and mentor chat.
#[derive(Parser)]
#[command(
    name = "skillwise",
    about = "SkillWise backend — document Q&A, quiz generation, and mentor chat over a completion API",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/skillwise.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve,

    /// Mint a bearer token for local development.
    ///
    /// Signs `owner` with the secret from the configured environment
    /// variable. Production tokens come from the real identity provider;
    /// this exists so the front end can be exercised without one.
    Token {
        /// Owner identity to embed in the token.
        owner: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => run_server(&config).await,
        Commands::Token { owner } => {
            let verifier = TokenVerifier::from_env(&config.auth.secret_env)?;
            println!("{}", verifier.issue(&owner));
            Ok(())
        }
    }
}
