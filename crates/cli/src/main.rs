//! Vendora CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (documents and session table)
//! vendora-cli migrate
//!
//! # Seed sellers and their products from a YAML file
//! vendora-cli seed catalog.yaml
//!
//! # Validate a seed file without touching the database
//! vendora-cli seed catalog.yaml --dry-run
//! ```
//!
//! # Environment Variables
//!
//! - `VENDORA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vendora-cli")]
#[command(author, version, about = "Vendora CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed sellers and products from a YAML file
    Seed {
        /// Path to the seed file
        file: String,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, dry_run } => commands::seed::run(&file, dry_run).await?,
    }
    Ok(())
}
