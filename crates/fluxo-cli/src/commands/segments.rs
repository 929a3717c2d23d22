//! Segment management commands

use anyhow::{bail, Result};
use fluxo_core::db::Database;

pub fn cmd_segments_list(db: &Database) -> Result<()> {
    let segments = db.list_segments()?;

    if segments.is_empty() {
        println!("No segments defined. Create one with:");
        println!("  fluxo segments add \"Filial SP\"");
        return Ok(());
    }

    println!();
    println!("🏷️  Segments");
    println!("   ─────────────────────────────");

    for segment in segments {
        match &segment.description {
            Some(description) => {
                println!("   {:>4}  {} - {}", segment.id, segment.name, description)
            }
            None => println!("   {:>4}  {}", segment.id, segment.name),
        }
    }

    println!();
    Ok(())
}

pub fn cmd_segments_add(db: &Database, name: &str, description: Option<&str>) -> Result<()> {
    let segment = db.create_segment(name, description)?;
    println!("✅ Created segment {} ({})", segment.name, segment.id);
    Ok(())
}

pub fn cmd_segments_delete(db: &Database, id: i64) -> Result<()> {
    if !db.delete_segment(id)? {
        bail!("Segment {} not found", id);
    }
    println!("✅ Deleted segment {}. Its transactions are now global.", id);
    Ok(())
}
