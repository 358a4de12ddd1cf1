//! spendcache - track personal expenses from the terminal.
//!
//! Each invocation runs one command against the expense API. The `shell`
//! subcommand keeps a single process (and so a single cache) alive across
//! many commands.

mod commands;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spendcache_core::{ApiClient, Config, ExpenseService, Session};

use commands::{run_shell, Cli, Command};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    let mut client = ApiClient::new(&config.api_base_url)?;
    if let Some(token) = Config::api_token() {
        client = client.with_token(token);
    }
    info!(api = %client.base_url(), "spendcache starting");

    let service = ExpenseService::new(client)
        .with_ttl(config.cache_ttl())
        .with_delete_policy(config.delete_policy);

    let mut session = Session::new();
    match cli.user.clone().or_else(|| config.last_user_id.clone()) {
        Some(user) => session.sign_in(user),
        None => session.sign_out(&service),
    }

    let mut stdout = io::stdout();
    match cli.command {
        Command::Expense(command) => command.execute(&service, &session, &mut stdout).await?,
        Command::Shell => run_shell(&service, &mut session).await?,
    }

    // Remember who was used last so `--user` can be omitted next time
    let current = session.user_id().map(str::to_string);
    if current.is_some() && current != config.last_user_id {
        config.last_user_id = current;
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    Ok(())
}
