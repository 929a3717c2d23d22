//! Bank statement file parsers (CSV, OFX, QIF)
//!
//! Each parser produces `StatementLine`s for the normalizer. Statement files
//! carry no provider-assigned transaction id, so lines get a synthetic
//! SHA-256 id over date, description, amount and the position in the file —
//! re-importing the same file is therefore idempotent.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use std::io::Read;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::StatementFormat;
use crate::normalize::StatementLine;

/// Detect the statement format from the beginning of the file
///
/// Returns None if the content matches no known format.
pub fn detect_statement_format(head: &str) -> Option<StatementFormat> {
    let trimmed = head.trim_start();

    // OFX: SGML header or bare <OFX> tag
    if trimmed.starts_with("OFXHEADER") || trimmed.to_uppercase().contains("<OFX") {
        return Some(StatementFormat::Ofx);
    }

    // QIF: "!Type:Bank", "!Type:CCard", ...
    if trimmed.starts_with("!Type:") {
        return Some(StatementFormat::Qif);
    }

    // CSV: a delimited header line with a date-ish column
    if let Some(first_line) = trimmed.lines().next() {
        let lower = first_line.to_lowercase();
        let delimited = first_line.matches([',', ';']).count() >= 2;
        let has_date_column = lower.contains("date") || lower.contains("data");
        if delimited && has_date_column {
            return Some(StatementFormat::Csv);
        }
    }

    None
}

/// Parse statement text in the given format
pub fn parse_statement<R: Read>(reader: R, format: StatementFormat) -> Result<Vec<StatementLine>> {
    match format {
        StatementFormat::Csv => parse_csv(reader),
        StatementFormat::Ofx => parse_ofx(reader),
        StatementFormat::Qif => parse_qif(reader),
    }
}

/// Synthetic external id for a statement line
///
/// Includes the line index so two identical rows in one file stay distinct,
/// while re-imports of the same file reproduce the same ids.
pub fn line_id(date: &NaiveDate, description: &str, amount: f64, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(index.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a CSV statement
///
/// Header-driven: accepts Portuguese and English column names
/// (data/date, historico/descricao/description, valor/amount, saldo/balance)
/// with comma or semicolon delimiters.
fn parse_csv<R: Read>(reader: R) -> Result<Vec<StatementLine>> {
    let mut content = String::new();
    let mut reader = reader;
    reader.read_to_string(&mut content)?;

    let delimiter = detect_delimiter(&content);
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let headers = rdr.headers()?.clone();
    let date_col = find_column(&headers, &["date", "data", "transaction date"])
        .ok_or_else(|| Error::Import("CSV statement is missing a date column".into()))?;
    let desc_col = find_column(
        &headers,
        &["description", "descricao", "descrição", "historico", "histórico", "memo"],
    )
    .ok_or_else(|| Error::Import("CSV statement is missing a description column".into()))?;
    let amount_col = find_column(&headers, &["amount", "valor", "value"])
        .ok_or_else(|| Error::Import("CSV statement is missing an amount column".into()))?;
    let balance_col = find_column(&headers, &["balance", "saldo", "running bal."]);
    let type_col = find_column(&headers, &["type", "tipo"]);

    let mut lines = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result?;

        let date_str = record
            .get(date_col)
            .ok_or_else(|| Error::Import("Missing date".into()))?;
        let date = parse_date(date_str)?;

        let description = record.get(desc_col).unwrap_or("").to_string();

        let amount_str = record
            .get(amount_col)
            .ok_or_else(|| Error::Import("Missing amount".into()))?;
        let amount = parse_amount(amount_str)?;

        let balance = balance_col
            .and_then(|col| record.get(col))
            .and_then(|s| parse_amount(s).ok());
        let txn_type = type_col
            .and_then(|col| record.get(col))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        lines.push(StatementLine {
            external_id: line_id(&date, &description, amount, index),
            date,
            description,
            amount,
            balance,
            institution: None,
            txn_type,
        });
    }

    debug!("Parsed {} CSV statement lines", lines.len());
    Ok(lines)
}

/// Parse an OFX statement
///
/// Tag scanner over `<STMTTRN>` blocks; tolerates the SGML variant where
/// closing tags are omitted. FITID becomes the external id when present.
fn parse_ofx<R: Read>(reader: R) -> Result<Vec<StatementLine>> {
    let mut content = String::new();
    let mut reader = reader;
    reader.read_to_string(&mut content)?;

    let institution = ofx_tag_value(&content, "ORG");

    let mut lines = Vec::new();
    let mut rest = content.as_str();
    let mut index = 0usize;
    while let Some(start) = find_ci(rest, "<STMTTRN>") {
        let after = &rest[start + "<STMTTRN>".len()..];
        let end = find_ci(after, "</STMTTRN>")
            .or_else(|| find_ci(after, "<STMTTRN>"))
            .unwrap_or(after.len());
        let block = &after[..end];

        let date = ofx_tag_value(block, "DTPOSTED")
            .and_then(|v| parse_ofx_date(&v))
            .ok_or_else(|| Error::Import("OFX transaction missing DTPOSTED".into()))?;
        let amount = ofx_tag_value(block, "TRNAMT")
            .and_then(|v| parse_amount(&v).ok())
            .ok_or_else(|| Error::Import("OFX transaction missing TRNAMT".into()))?;
        let description = ofx_tag_value(block, "MEMO")
            .or_else(|| ofx_tag_value(block, "NAME"))
            .unwrap_or_default();
        let txn_type = ofx_tag_value(block, "TRNTYPE");

        let external_id = ofx_tag_value(block, "FITID")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| line_id(&date, &description, amount, index));

        lines.push(StatementLine {
            external_id,
            date,
            description,
            amount,
            balance: None,
            institution: institution.clone(),
            txn_type,
        });

        rest = &after[end..];
        index += 1;
    }

    debug!("Parsed {} OFX transactions", lines.len());
    Ok(lines)
}

/// Parse a QIF statement
///
/// Line-prefixed records: D = date, T/U = amount, P = payee, M = memo,
/// `^` terminates a record. QIF has no transaction ids at all.
fn parse_qif<R: Read>(reader: R) -> Result<Vec<StatementLine>> {
    let mut content = String::new();
    let mut reader = reader;
    reader.read_to_string(&mut content)?;

    let mut lines = Vec::new();
    let mut date: Option<NaiveDate> = None;
    let mut amount: Option<f64> = None;
    let mut payee: Option<String> = None;
    let mut memo: Option<String> = None;
    let mut index = 0usize;

    for raw_line in content.lines() {
        let line = raw_line.trim_end();
        if line.starts_with('!') || line.is_empty() || !line.is_char_boundary(1) {
            continue;
        }
        match line.split_at(1) {
            ("D", value) => date = Some(parse_date(value)?),
            ("T", value) | ("U", value) => amount = Some(parse_amount(value)?),
            ("P", value) => payee = Some(value.trim().to_string()),
            ("M", value) => memo = Some(value.trim().to_string()),
            ("^", _) => {
                if let (Some(d), Some(a)) = (date.take(), amount.take()) {
                    let description = payee.take().or_else(|| memo.take()).unwrap_or_default();
                    lines.push(StatementLine {
                        external_id: line_id(&d, &description, a, index),
                        date: d,
                        description,
                        amount: a,
                        balance: None,
                        institution: None,
                        txn_type: None,
                    });
                    index += 1;
                } else {
                    // incomplete record, reset accumulated fields
                    date = None;
                    amount = None;
                    payee = None;
                    memo = None;
                }
            }
            _ => {}
        }
    }

    debug!("Parsed {} QIF transactions", lines.len());
    Ok(lines)
}

/// Parse a date string in common Brazilian and ISO formats
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%d/%m/%Y", // 15/01/2024 (Brazilian)
        "%d/%m/%y", // 15/01/24
        "%Y-%m-%d", // 2024-01-15
        "%d-%m-%Y", // 15-01-2024
        "%m/%d/%Y", // 01/15/2024 (US exports)
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, thousands separators
/// and Brazilian decimal commas ("R$ 1.234,56")
pub fn parse_amount(s: &str) -> Result<f64> {
    let mut cleaned: String = s
        .trim()
        .replace("R$", "")
        .replace(['$', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    match (last_comma, last_dot) {
        // decimal comma: drop dot thousands separators, comma becomes the point
        (Some(c), Some(d)) if c > d => {
            cleaned = cleaned.replace('.', "").replace(',', ".");
        }
        (Some(_), None) => {
            cleaned = cleaned.replace(',', ".");
        }
        // decimal point: commas are thousands separators
        _ => {
            cleaned = cleaned.replace(',', "");
        }
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}

fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");
    if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_lowercase();
        names.iter().any(|n| h == *n)
    })
}

/// Case-insensitive substring search returning a byte offset
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Value of an OFX tag: text after `<TAG>` up to the next `<` or end of line
fn ofx_tag_value(block: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let start = find_ci(block, &open)? + open.len();
    let rest = &block[start..];
    let end = rest.find(['<', '\r', '\n']).unwrap_or(rest.len());
    let value = rest[..end].trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// OFX DTPOSTED: "YYYYMMDD" optionally followed by time and timezone
fn parse_ofx_date(s: &str) -> Option<NaiveDate> {
    let digits = s.get(..8)?;
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}
