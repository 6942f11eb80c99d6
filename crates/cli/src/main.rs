//! Deploy Bot CLI - Operator tools for inspecting deploy prompts.
//!
//! # Usage
//!
//! ```bash
//! # Run the CircleCI lookup chain for a branch and show the prompt token
//! deploy-cli lookup release/fee_collab
//!
//! # Validate and pretty-print a token copied from a button value
//! deploy-cli token decode '{"branch_name":"main",...}'
//! ```
//!
//! # Commands
//!
//! - `lookup` - Resolve a branch to its pending approval job
//! - `token decode` - Decode a deploy prompt token

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "deploy-cli")]
#[command(author, version, about = "Deploy bot operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the pending approval job for a branch (read-only)
    Lookup {
        /// Branch whose latest pipeline should be inspected
        branch: String,
    },
    /// Work with deploy prompt tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Validate and pretty-print a token
    Decode {
        /// Button value as sent by Slack
        value: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Lookup { branch } => commands::lookup::run(&branch).await?,
        Commands::Token { action } => match action {
            TokenAction::Decode { value } => commands::token::decode(&value)?,
        },
    }
    Ok(())
}
