//! CRM CLI - database migrations and identity management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! crm-cli migrate
//!
//! # Make sure the admin and customer role groups exist
//! crm-cli group ensure
//!
//! # Create a staff user
//! crm-cli user create -u alice -e alice@example.com --role admin
//!
//! # Move a user to another role group
//! crm-cli user set-role -u bob --role admin
//! ```
//!
//! # Environment Variables
//!
//! - `CRM_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `CRM_USER_PASSWORD` - password for `user create` when `--password` is omitted

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use crm_core::Role;

mod commands;

#[derive(Parser)]
#[command(name = "crm-cli")]
#[command(author, version, about = "CRM management tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage role groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum GroupAction {
    /// Create the `admin` and `customer` groups if missing
    Ensure,
    /// List all role groups
    List,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user; customers get a profile like self-registered users
    Create {
        /// Username (letters, digits and @/./+/-/_)
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long, default_value = "")]
        email: String,

        /// Password
        #[arg(short, long, env = "CRM_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Role (`admin` or `customer`)
        #[arg(short, long, default_value = "customer")]
        role: Role,
    },
    /// Replace a user's role group
    SetRole {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Role (`admin` or `customer`)
        #[arg(short, long)]
        role: Role,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Group { action } => match action {
            GroupAction::Ensure => commands::group::ensure().await?,
            GroupAction::List => commands::group::list().await?,
        },
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                role,
            } => {
                commands::user::create(&username, &email, &password, role).await?;
            }
            UserAction::SetRole { username, role } => {
                commands::user::set_role(&username, role).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_role_argument_parses() {
        let cli = Cli::try_parse_from([
            "crm-cli", "user", "create", "-u", "alice", "-p", "s3cret-pass", "--role", "admin",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::User {
                action: UserAction::Create {
                    role: Role::Admin,
                    ..
                }
            })
        ));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let cli = Cli::try_parse_from(["crm-cli", "user", "set-role", "-u", "bob", "-r", "root"]);
        assert!(cli.is_err());
    }
}
