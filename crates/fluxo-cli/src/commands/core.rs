//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Show database status

use std::path::Path;

use anyhow::{Context, Result};
use fluxo_core::db::{Database, TransactionFilter};

/// Open the database, running migrations as needed
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import a statement: fluxo import --file extrato.csv");
    println!("  2. Or sync a provider: fluxo sync pluggy --scope <account-id>");
    println!("  3. Start the API:      fluxo serve");

    Ok(())
}

pub fn cmd_status(db_path: &Path) -> Result<()> {
    use std::fs;

    println!();
    println!("📊 Fluxo Status");
    println!("   ─────────────────────────────────────────────");

    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
        println!();
        return Ok(());
    }

    match open_db(db_path) {
        Ok(db) => {
            let transactions = db.count_transactions(&TransactionFilter::default())?;
            let segments = db.list_segments()?.len();
            let syncs = db.count_sync_runs()?;

            println!();
            println!("   Transactions: {}", transactions);
            println!("   Segments: {}", segments);
            println!("   Sync runs: {}", syncs);

            if let Some(last) = db.list_sync_runs(1, 0)?.first() {
                println!();
                println!(
                    "   Last sync: {} ({}) at {} - imported {}, updated {}, skipped {}",
                    last.provider,
                    last.scope.as_deref().unwrap_or("-"),
                    last.created_at.format("%Y-%m-%d %H:%M"),
                    last.imported,
                    last.updated,
                    last.skipped
                );
            }
        }
        Err(e) => {
            println!();
            println!("   ❌ Error opening database: {}", e);
        }
    }

    println!();
    Ok(())
}
