//! Provider sync command

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use fluxo_core::models::ProviderKind;
use fluxo_core::providers::{FetchScope, ProviderClient};
use fluxo_core::sync::SyncEngine;

use super::open_db;

fn parse_date(value: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            s.parse::<NaiveDate>()
                .with_context(|| format!("Invalid --{} date (use YYYY-MM-DD)", flag))
        })
        .transpose()
}

pub async fn cmd_sync(
    db_path: &Path,
    provider: &str,
    scope: &str,
    from: Option<&str>,
    to: Option<&str>,
    segment: Option<i64>,
    json: bool,
) -> Result<()> {
    let kind = provider
        .parse::<ProviderKind>()
        .map_err(|_| anyhow::anyhow!("Unknown provider '{}', expected pluggy|belvo", provider))?;
    if kind == ProviderKind::Statement {
        bail!("Statement files are imported with 'fluxo import'");
    }
    if scope.trim().is_empty() {
        bail!("A non-empty --scope (account/link id) is required");
    }

    let from = parse_date(from, "from")?;
    let to = parse_date(to, "to")?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            bail!("--from date is after --to date");
        }
    }

    let db = open_db(db_path)?;
    if let Some(segment_id) = segment {
        if db.get_segment(segment_id)?.is_none() {
            bail!("Segment {} not found", segment_id);
        }
    }

    let client = ProviderClient::from_env(kind)?;
    let fetch_scope = FetchScope::new(scope.trim()).with_range(from, to);

    println!("🔄 Syncing {} ({})...", kind, fetch_scope.scope);

    let engine = SyncEngine::new(db);
    let outcome = engine.sync(&client, &fetch_scope, segment).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    println!("✅ Sync complete");
    println!("   Records fetched: {}", outcome.total);
    println!("   Imported: {}", outcome.imported);
    println!("   Updated: {}", outcome.updated);
    if outcome.skipped > 0 {
        println!("   Skipped (no usable id): {}", outcome.skipped);
    }

    Ok(())
}
