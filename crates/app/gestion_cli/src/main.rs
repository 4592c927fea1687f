//! `gestion`: command-line client for the Gestion project/task API.
//!
//! Tokens persist between invocations in the credentials file; an expired
//! access token is refreshed transparently on the next call.

pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use gestion_client::config::{DEFAULT_API_URL, default_credentials_path};
use gestion_client::{ClientConfig, Session};
use gestion_core::models::task::TaskFilter;
use tracing::{debug, error};

mod cli;
mod commands;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gestion_client=debug".into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> Result<()> {
    if matches!(args.command, Commands::Version) {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = ClientConfig::new(
        args.api_url.as_deref().unwrap_or(DEFAULT_API_URL),
        args.credentials.unwrap_or_else(default_credentials_path),
    )?;
    debug!(api = %config.api_base_url, credentials = %config.credentials_path.display(), "configured");
    let session = Session::from_config(config);

    match args.command {
        Commands::Login { username, password } => {
            commands::login(&session, &username, &password).await
        }
        Commands::Logout => {
            commands::logout(&session);
            Ok(())
        }
        Commands::Whoami => commands::whoami(&session).await,
        Commands::Register { username, password } => {
            commands::register(&session, &username, &password).await
        }
        Commands::Users => commands::users(&session).await,
        Commands::Projects { filter } => commands::projects(&session, filter.into()).await,
        Commands::ProjectDelete { project } => commands::project_delete(&session, project).await,
        Commands::ProjectTransfer {
            project,
            new_owner_id,
        } => commands::project_transfer(&session, project, new_owner_id).await,
        Commands::Tasks {
            project,
            status,
            assignee,
            priority,
        } => {
            let filter = TaskFilter {
                project_id: project,
                status,
                assignee,
                priority,
            };
            commands::tasks(&session, filter).await
        }
        Commands::Board { project } => commands::board(&session, project).await,
        Commands::TaskStatus { task, status } => {
            commands::task_status(&session, task, status).await
        }
        Commands::TaskDelete { task } => commands::task_delete(&session, task).await,
        Commands::Version => Ok(()),
    }
}
