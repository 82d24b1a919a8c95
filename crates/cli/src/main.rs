//! Amooora CLI - Operator commands against the access directory.
//!
//! # Usage
//!
//! ```bash
//! # List access records, optionally filtered
//! amooora-cli users list --query admin
//!
//! # Set one user's role and status
//! amooora-cli users set-access 8c1f... --role admin-events --status active
//!
//! # Delete accounts (asks for --yes first)
//! amooora-cli users delete 8c1f... 2d9a... --yes
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_URL` - Backend base URL
//! - `BACKEND_SERVICE_KEY` - Service key; bypasses row-level policies

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "amooora-cli")]
#[command(author, version, about = "Amooora operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user access
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List access records
    List {
        /// Case-insensitive filter on email, display name or ID
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Set a user's role and status
    SetAccess {
        /// User ID
        id: String,

        /// Role (`viewer`, `admin-places`, `admin-events`, `admin-services`, `admin-general`)
        #[arg(short, long)]
        role: String,

        /// Status (`active`, `blocked`, `inactive`)
        #[arg(short, long, default_value = "active")]
        status: String,
    },
    /// Delete user accounts
    Delete {
        /// User IDs
        #[arg(required = true)]
        ids: Vec<String>,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
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

async fn run(cli: Cli) -> Result<(), commands::users::UsersError> {
    match cli.command {
        Commands::Users { action } => match action {
            UsersAction::List { query } => {
                commands::users::list(query.as_deref()).await?;
            }
            UsersAction::SetAccess { id, role, status } => {
                commands::users::set_access(&id, &role, &status).await?;
            }
            UsersAction::Delete { ids, yes } => {
                commands::users::delete(&ids, yes).await?;
            }
        },
    }
    Ok(())
}
