//! Transaction listing command

use anyhow::Result;
use fluxo_core::db::{Database, TransactionFilter};
use fluxo_core::models::ProviderKind;

use super::truncate;

pub fn cmd_transactions_list(
    db: &Database,
    limit: i64,
    provider: Option<&str>,
    segment: Option<i64>,
) -> Result<()> {
    let provider = provider
        .map(|p| {
            p.parse::<ProviderKind>().map_err(|_| {
                anyhow::anyhow!("Unknown provider '{}', expected pluggy|belvo|statement", p)
            })
        })
        .transpose()?;

    let filter = TransactionFilter {
        provider,
        segment_id: segment,
        ..Default::default()
    };
    let transactions = db.list_transactions(&filter, limit.max(1), 0)?;
    let total = db.count_transactions(&filter)?;

    if transactions.is_empty() {
        println!("No transactions found. Import a statement with:");
        println!("  fluxo import --file extrato.csv");
        return Ok(());
    }

    println!();
    println!("💳 Transactions ({} of {})", transactions.len(), total);
    println!("   ──────────────────────────────────────────────────────────────");

    for tx in &transactions {
        let arrow = match tx.direction {
            fluxo_core::models::Direction::Receivable => "↑",
            fluxo_core::models::Direction::Payable => "↓",
        };
        println!(
            "   {:>5}  {}  {} {:>12.2}  [{}]  {}",
            tx.id,
            tx.date,
            arrow,
            tx.amount,
            tx.provider,
            truncate(&tx.description, 40)
        );
    }

    println!();
    Ok(())
}
