//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use fluxo_core::db::{Database, TransactionFilter};

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

// ========== Init / Status ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fluxo.db");

    commands::cmd_init(&db_path).unwrap();
    assert!(db_path.exists());

    // status works on the initialized database
    commands::cmd_status(&db_path).unwrap();
}

#[test]
fn test_cmd_status_uninitialized() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("missing.db");

    // no database yet is not an error
    commands::cmd_status(&db_path).unwrap();
}

// ========== Import ==========

#[test]
fn test_cmd_import_csv() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fluxo.db");

    let statement_path = dir.path().join("extrato.csv");
    let mut file = std::fs::File::create(&statement_path).unwrap();
    writeln!(file, "data;descricao;valor").unwrap();
    writeln!(file, "15/01/2024;PIX RECEBIDO;150,00").unwrap();
    writeln!(file, "16/01/2024;PAGTO BOLETO;-89,90").unwrap();
    drop(file);

    commands::cmd_import(&db_path, &statement_path, None, None, false).unwrap();

    let db = commands::open_db(&db_path).unwrap();
    assert_eq!(
        db.count_transactions(&TransactionFilter::default()).unwrap(),
        2
    );

    // second import of the same file updates instead of duplicating
    commands::cmd_import(&db_path, &statement_path, None, None, true).unwrap();
    assert_eq!(
        db.count_transactions(&TransactionFilter::default()).unwrap(),
        2
    );
}

#[test]
fn test_cmd_import_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fluxo.db");

    let result = commands::cmd_import(&db_path, &dir.path().join("nope.csv"), None, None, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_import_unknown_format_flag() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fluxo.db");

    let statement_path = dir.path().join("extrato.csv");
    std::fs::write(&statement_path, "data;descricao;valor\n").unwrap();

    let result = commands::cmd_import(&db_path, &statement_path, Some("xml"), None, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_import_unknown_segment() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fluxo.db");

    let statement_path = dir.path().join("extrato.csv");
    std::fs::write(
        &statement_path,
        "data;descricao;valor\n15/01/2024;PIX;10,00\n",
    )
    .unwrap();

    let result = commands::cmd_import(&db_path, &statement_path, None, Some(42), false);
    assert!(result.is_err());
}

// ========== Segments ==========

#[test]
fn test_cmd_segments_add_and_list() {
    let db = setup_test_db();

    commands::cmd_segments_add(&db, "Filial SP", Some("Loja de SP")).unwrap();
    commands::cmd_segments_add(&db, "Matriz", None).unwrap();
    commands::cmd_segments_list(&db).unwrap();

    assert_eq!(db.list_segments().unwrap().len(), 2);
}

#[test]
fn test_cmd_segments_delete() {
    let db = setup_test_db();
    let segment = db.create_segment("Filial", None).unwrap();

    commands::cmd_segments_delete(&db, segment.id).unwrap();
    assert!(db.list_segments().unwrap().is_empty());

    let result = commands::cmd_segments_delete(&db, segment.id);
    assert!(result.is_err());
}

// ========== Transactions ==========

#[test]
fn test_cmd_transactions_list_empty() {
    let db = setup_test_db();
    commands::cmd_transactions_list(&db, 20, None, None).unwrap();
}

#[test]
fn test_cmd_transactions_list_rejects_unknown_provider() {
    let db = setup_test_db();
    let result = commands::cmd_transactions_list(&db, 20, Some("nubank"), None);
    assert!(result.is_err());
}

// ========== Helpers ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly-10", 10), "exactly-10");
    assert_eq!(truncate("a longer description", 10), "a longe...");
}

#[test]
fn test_truncate_multibyte() {
    // accented characters must not be split mid-character
    assert_eq!(truncate("Transferência", 13), "Transferência");
    let cut = truncate("TRANSFERÊNCIA RECEBIDA ÁGUA E LUZ FILIAL CENTRO", 20);
    assert!(cut.ends_with("..."));
    assert_eq!(cut.chars().count(), 20);
    assert_eq!(truncate("Água e luz da matriz São Paulo", 10), "Água e ...");
}
