//! Basket CLI - session migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table in STOREFRONT_DATABASE_URL
//! basket-cli migrate sessions
//!
//! # Validate a catalog for the in-memory backend
//! basket-cli catalog check catalog.yaml
//!
//! # Print the demo catalog
//! basket-cli catalog demo
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "basket-cli")]
#[command(author, version, about = "Basket storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Work with catalog files
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Create the session store table
    Sessions,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Validate a YAML catalog file
    Check {
        /// Path to the catalog
        file: PathBuf,
    },
    /// Print the built-in demo catalog as YAML
    Demo,
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Sessions => commands::migrate::sessions().await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Check { file } => {
                commands::catalog::check(&file)?;
            }
            CatalogAction::Demo => {
                let yaml = commands::catalog::demo_yaml()?;
                #[allow(clippy::print_stdout)]
                {
                    print!("{yaml}");
                }
            }
        },
    }
    Ok(())
}
