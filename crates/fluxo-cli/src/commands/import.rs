//! Statement file import command

use std::path::Path;

use anyhow::{bail, Context, Result};
use fluxo_core::models::StatementFormat;
use fluxo_core::sync::SyncEngine;

use super::open_db;

pub fn cmd_import(
    db_path: &Path,
    file: &Path,
    format: Option<&str>,
    segment: Option<i64>,
    json: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read statement file: {}", file.display()))?;

    let format = format
        .map(|f| {
            f.parse::<StatementFormat>()
                .map_err(|_| anyhow::anyhow!("Unknown format '{}', expected csv|ofx|qif", f))
        })
        .transpose()?;

    let db = open_db(db_path)?;
    if let Some(segment_id) = segment {
        if db.get_segment(segment_id)?.is_none() {
            bail!("Segment {} not found", segment_id);
        }
    }

    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("statement");

    println!("📥 Importing {}...", file.display());

    let engine = SyncEngine::new(db);
    let outcome = engine.import_statement(&content, format, name, segment)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    println!("✅ Import complete");
    println!("   Records in file: {}", outcome.total);
    println!("   Imported: {}", outcome.imported);
    println!("   Updated: {}", outcome.updated);
    if outcome.skipped > 0 {
        println!("   Skipped (no usable id): {}", outcome.skipped);
    }

    Ok(())
}
