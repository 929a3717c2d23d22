//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fluxo - Bank transaction ingestion for small businesses
#[derive(Parser)]
#[command(name = "fluxo")]
#[command(about = "Normalize and deduplicate bank transactions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "fluxo.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import a bank statement file
    Import {
        /// Statement file to import (CSV, OFX, or QIF)
        #[arg(short, long)]
        file: PathBuf,

        /// Statement format (auto-detected if not specified)
        #[arg(long)]
        format: Option<String>,

        /// Segment ID to attach imported transactions to
        #[arg(short, long)]
        segment: Option<i64>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sync transactions from an open-finance provider
    Sync {
        /// Provider to sync from: pluggy or belvo
        provider: String,

        /// Account id (Pluggy) or link id (Belvo)
        #[arg(short, long)]
        scope: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Segment ID to attach fetched transactions to
        #[arg(long)]
        segment: Option<i64>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a
        /// network. By default, the server requires an API key from
        /// FLUXO_API_KEYS.
        #[arg(long)]
        no_auth: bool,
    },

    /// List recent transactions
    Transactions {
        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Filter by source provider (pluggy, belvo, statement)
        #[arg(long)]
        provider: Option<String>,

        /// Filter by segment ID
        #[arg(long)]
        segment: Option<i64>,
    },

    /// Manage segments (list, add, delete)
    Segments {
        #[command(subcommand)]
        action: Option<SegmentsAction>,
    },

    /// Show database status
    Status,
}

#[derive(Subcommand)]
pub enum SegmentsAction {
    /// Create a segment
    Add {
        /// Segment name (must be unique)
        name: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a segment (its transactions become global)
    Delete {
        /// Segment ID
        id: i64,
    },
}
