//! DishDash CLI - database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations (app schema and session table)
//! dd-cli migrate
//!
//! # Create a vendor account
//! dd-cli vendor create -e owner@example.com -n "Luigi" -p 'correct horse battery'
//!
//! # Load restaurants and menus from YAML
//! dd-cli seed catalog catalog.yaml --owner-email owner@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dd-cli")]
#[command(author, version, about = "DishDash CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage vendor accounts
    Vendor {
        #[command(subcommand)]
        action: VendorAction,
    },
    /// Load data into the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum VendorAction {
    /// Create a vendor account that signs in with a password
    Create {
        /// Vendor email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Restaurants and menu items from a YAML file
    Catalog {
        /// Path to the YAML file
        file: PathBuf,

        /// Owner for restaurants that do not name one
        #[arg(long)]
        owner_email: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Vendor { action } => match action {
            VendorAction::Create {
                email,
                name,
                password,
            } => {
                commands::vendor::create(&email, &name, &password).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file, owner_email } => {
                commands::seed::catalog(&file, owner_email.as_deref()).await?;
            }
        },
    }
    Ok(())
}
