//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use fluxo_core::db::Database;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        api_keys: vec![],
    }
}

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    create_router(db, test_config())
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], true);
}

// ========== Auth ==========

#[tokio::test]
async fn test_auth_required_rejects_anonymous() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        allowed_origins: vec![],
        api_keys: vec!["secret-key".to_string()],
    };
    let app = create_router(db, config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_accepts_valid_api_key() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        allowed_origins: vec![],
        api_keys: vec!["secret-key".to_string()],
    };
    let app = create_router(db, config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .header("authorization", "Bearer secret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key_constant_time() {
    let keys = vec!["correct-key".to_string()];
    assert!(validate_api_key("correct-key", &keys));
    assert!(!validate_api_key("wrong-key!!", &keys));
    assert!(!validate_api_key("correct-key-longer", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("anything", &[]));
}

// ========== Transactions ==========

#[tokio::test]
async fn test_list_transactions_empty() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["total"], 0);
    assert!(json["transactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_transactions_rejects_unknown_provider() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions?provider=nubank")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_transaction_not_found() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_transaction_status() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db.clone(), test_config());

    // seed one transaction through a statement import
    let content = "data;descricao;valor\n15/01/2024;PIX RECEBIDO;150,00\n";
    let import = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement?name=extrato.csv")
                .header("content-type", "text/csv")
                .body(Body::from(content))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(import.status(), StatusCode::OK);

    let stored = db
        .list_transactions(&fluxo_core::db::TransactionFilter::default(), 10, 0)
        .unwrap();
    let id = stored[0].id;

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/transactions/{}/status", id),
            serde_json::json!({"status": "paid"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "paid");
}

#[tokio::test]
async fn test_update_transaction_status_rejects_unknown() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/transactions/1/status",
            serde_json::json!({"status": "archived"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Statement import ==========

#[tokio::test]
async fn test_import_statement_counts_and_idempotency() {
    let app = setup_test_app();
    let content =
        "data;descricao;valor\n15/01/2024;PIX RECEBIDO;150,00\n16/01/2024;PAGTO BOLETO;-89,90\n";

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement?name=extrato.csv")
                .header("content-type", "text/csv")
                .body(Body::from(content))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let json = get_body_json(first).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["imported"], 2);
    assert_eq!(json["updated"], 0);

    let second = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement?name=extrato.csv")
                .header("content-type", "text/csv")
                .body(Body::from(content))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let json = get_body_json(second).await;
    assert_eq!(json["imported"], 0);
    assert_eq!(json["updated"], 2);
}

#[tokio::test]
async fn test_import_statement_accepts_multi_megabyte_body() {
    let app = setup_test_app();

    // one valid row padded past the default axum body limit (2 MB)
    let padding = "X".repeat(3 * 1024 * 1024);
    let content = format!("data;descricao;valor\n15/01/2024;PIX {};150,00\n", padding);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement?name=extrato.csv")
                .header("content-type", "text/csv")
                .body(Body::from(content))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["imported"], 1);
}

#[tokio::test]
async fn test_import_statement_oversized_body_is_rejected() {
    let app = setup_test_app();

    let padding = "X".repeat(MAX_UPLOAD_SIZE + 1024);
    let content = format!("data;descricao;valor\n15/01/2024;PIX {};150,00\n", padding);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement")
                .header("content-type", "text/csv")
                .body(Body::from(content))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_statement_empty_body_is_rejected() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement")
                .body(Body::from(""))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_statement_undetectable_format_is_rejected() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement")
                .body(Body::from("definitely not a bank statement"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Sync ==========

#[tokio::test]
async fn test_sync_rejects_unknown_provider() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/sync/nubank",
            serde_json::json!({"scope": "acc-1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_rejects_statement_provider() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/sync/statement",
            serde_json::json!({"scope": "acc-1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_rejects_empty_scope() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/sync/pluggy",
            serde_json::json!({"scope": "  "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_syncs_after_import() {
    let app = setup_test_app();
    let content = "data;descricao;valor\n15/01/2024;PIX RECEBIDO;150,00\n";

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement?name=extrato.csv")
                .body(Body::from(content))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/syncs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 1);
    let syncs = json["syncs"].as_array().unwrap();
    assert_eq!(syncs[0]["provider"], "statement");
    assert_eq!(syncs[0]["scope"], "extrato.csv");
    assert_eq!(syncs[0]["imported"], 1);
}

// ========== Segments ==========

#[tokio::test]
async fn test_segment_crud() {
    let app = setup_test_app();

    // create
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/segments",
            serde_json::json!({"name": "Filial SP", "description": "Loja de SP"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = get_body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["name"], "Filial SP");

    // duplicate name
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/segments",
            serde_json::json!({"name": "Filial SP"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // update
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/segments/{}", id),
            serde_json::json!({"name": "Filial RJ"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = get_body_json(response).await;
    assert_eq!(updated["name"], "Filial RJ");

    // list
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/segments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = get_body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // delete
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/segments/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // gone
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/segments/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_segment_requires_name() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/segments",
            serde_json::json!({"name": "  "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Reports ==========

#[tokio::test]
async fn test_report_summary() {
    let app = setup_test_app();
    let content =
        "data;descricao;valor\n15/01/2024;PIX RECEBIDO;150,00\n16/01/2024;PAGTO BOLETO;-89,90\n";

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/statement?name=extrato.csv")
                .body(Body::from(content))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/reports/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["receivable"], 150.0);
    assert_eq!(json["payable"], 89.9);
    assert_eq!(json["transactions"], 2);
}

#[tokio::test]
async fn test_report_summary_rejects_half_open_range() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/reports/summary?from=2024-01-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Audit ==========

#[tokio::test]
async fn test_audit_log_records_reads() {
    let app = setup_test_app();

    // any listed endpoint writes an audit entry
    app.clone()
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/audit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert!(!entries.is_empty());
    assert_eq!(entries.last().unwrap()["action"], "list");
    assert_eq!(entries.last().unwrap()["user_email"], "local-dev");
}
