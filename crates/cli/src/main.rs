//! Readieg CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Create tables and the session store schema
//! readieg-cli migrate
//!
//! # Load the bundled sample catalog
//! readieg-cli seed
//!
//! # Load a different catalog file
//! readieg-cli seed --file path/to/books.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Insert sample books unless the catalog is already populated

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "readieg-cli")]
#[command(author, version, about = "Readieg library CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog with sample books
    Seed {
        /// YAML file with the books to insert
        #[arg(short, long, default_value = commands::seed::DEFAULT_FILE)]
        file: String,
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
        Commands::Seed { file } => commands::seed::books(&file).await?,
    }
    Ok(())
}
