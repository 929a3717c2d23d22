//! Fluxo CLI - Bank transaction ingestion for small businesses
//!
//! Usage:
//!   fluxo init                      Initialize database
//!   fluxo import --file extrato.csv Import a bank statement (auto-detects format)
//!   fluxo sync pluggy --scope ID    Sync transactions from a provider
//!   fluxo serve --port 3000         Start the REST API server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import {
            file,
            format,
            segment,
            json,
        } => commands::cmd_import(&cli.db, &file, format.as_deref(), segment, json),
        Commands::Sync {
            provider,
            scope,
            from,
            to,
            segment,
            json,
        } => {
            commands::cmd_sync(
                &cli.db,
                &provider,
                &scope,
                from.as_deref(),
                to.as_deref(),
                segment,
                json,
            )
            .await
        }
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&cli.db, &host, port, no_auth).await,
        Commands::Transactions {
            limit,
            provider,
            segment,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_transactions_list(&db, limit, provider.as_deref(), segment)
        }
        Commands::Segments { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_segments_list(&db),
                Some(SegmentsAction::Add { name, description }) => {
                    commands::cmd_segments_add(&db, &name, description.as_deref())
                }
                Some(SegmentsAction::Delete { id }) => commands::cmd_segments_delete(&db, id),
            }
        }
        Commands::Status => commands::cmd_status(&cli.db),
    }
}
