use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use attrsql::{CompletionBackend, GenerationOptions, Translator};
use attrsql_server::server::handlers::sessions::{GenerateResponse, SessionResponse, TableView};
use attrsql_server::server::{create_app, AppState};
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

/// Fails any row whose attribute is `broken`, answers everything else.
struct FakeLlm;

#[async_trait]
impl CompletionBackend for FakeLlm {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        if prompt.contains("Attribute: broken") {
            return Err(anyhow!("connection refused"));
        }
        let attribute = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Attribute: "))
            .unwrap_or("unknown");
        Ok(format!("  expr AS {attribute}\n"))
    }
}

fn test_server() -> TestServer {
    let state = AppState::new(
        Translator::new(Arc::new(FakeLlm)),
        GenerationOptions::default(),
    );
    let app = create_app(state, None).expect("router");
    TestServer::new(app).expect("test server")
}

async fn new_session(server: &TestServer) -> SessionResponse {
    let response = server.post("/api/sessions").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<SessionResponse>()
}

const UPLOAD: &str = "TargetObject,TargetObjectAttribute,CalculationLogic,SQLContext\n\
orders,total_amount,sum of quantity times price,\n\
orders,broken,count of orders,\n";

#[tokio::test]
async fn health_and_page_are_served() {
    let server = test_server();

    let health = server.get("/health").await.json::<Value>();
    assert_eq!(health["status"], "healthy");

    let page = server.get("/").await;
    assert_eq!(page.status_code(), StatusCode::OK);
    assert!(page.text().contains("Generate SQL and Export CSV"));
}

#[tokio::test]
async fn new_session_has_input_schema() {
    let server = test_server();
    let session = new_session(&server).await;

    assert_eq!(
        session.table,
        TableView {
            columns: vec![
                "TargetObject".to_string(),
                "TargetObjectAttribute".to_string(),
                "CalculationLogic".to_string(),
                "SQLContext".to_string(),
            ],
            rows: vec![],
        }
    );
}

#[tokio::test]
async fn generate_on_empty_table_is_a_warning() {
    let server = test_server();
    let session = new_session(&server).await;

    let response = server
        .post(&format!("/api/sessions/{}/generate", session.session_id))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.json::<Value>(),
        json!({ "warning": "Please provide some input data." })
    );

    let after = server
        .get(&format!("/api/sessions/{}", session.session_id))
        .await
        .json::<SessionResponse>();
    assert_eq!(after.table, session.table);
}

#[tokio::test]
async fn upload_generate_and_export() {
    let server = test_server();
    let id = new_session(&server).await.session_id;

    let uploaded = server
        .post(&format!("/api/sessions/{id}/upload"))
        .text(UPLOAD)
        .await;
    assert_eq!(uploaded.status_code(), StatusCode::OK);
    assert_eq!(uploaded.json::<TableView>().rows.len(), 2);

    let generated = server
        .post(&format!("/api/sessions/{id}/generate"))
        .await
        .json::<GenerateResponse>();
    assert_eq!(generated.succeeded, 1);
    assert_eq!(generated.failed, 1);
    assert_eq!(generated.outcomes[0].sql.as_deref(), Some("expr AS total_amount"));
    assert_eq!(generated.outcomes[1].status, "error");
    assert_eq!(generated.outcomes[1].error.as_deref(), Some("connection refused"));
    assert_eq!(generated.download_url, format!("/api/sessions/{id}/export"));

    let export = server.get(&generated.download_url).await;
    assert_eq!(export.status_code(), StatusCode::OK);
    assert_eq!(export.header("content-type"), "text/csv");
    assert_eq!(
        export.header("content-disposition"),
        "attachment; filename=\"sql_output.csv\""
    );
    assert_eq!(
        export.text(),
        "TargetObject,TargetObjectAttribute,CalculationLogic,SQLContext,SQLOutput\n\
orders,total_amount,sum of quantity times price,,expr AS total_amount\n\
orders,broken,count of orders,,-- ERROR generating SQL: connection refused\n"
    );
}

#[tokio::test]
async fn grid_edits_add_and_remove_rows() {
    let server = test_server();
    let id = new_session(&server).await.session_id;

    server.post(&format!("/api/sessions/{id}/rows")).await;
    server.post(&format!("/api/sessions/{id}/rows")).await;

    let edited = server
        .put(&format!("/api/sessions/{id}/rows/1"))
        .json(&json!({ "field": "TargetObjectAttribute", "value": "margin" }))
        .await
        .json::<TableView>();
    assert_eq!(edited.rows[1][1], "margin");

    let removed = server
        .delete(&format!("/api/sessions/{id}/rows/0"))
        .await
        .json::<TableView>();
    assert_eq!(removed.rows.len(), 1);
    assert_eq!(removed.rows[0][1], "margin");

    let missing = server
        .put(&format!("/api/sessions/{id}/rows/7"))
        .json(&json!({ "field": "CalculationLogic", "value": "x" }))
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_upload_is_reported_and_table_kept() {
    let server = test_server();
    let id = new_session(&server).await.session_id;
    server
        .post(&format!("/api/sessions/{id}/upload"))
        .text(UPLOAD)
        .await;

    let response = server
        .post(&format!("/api/sessions/{id}/upload"))
        .text("TargetObjectAttribute,CalculationLogic\na,b,c\n")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid CSV"));

    let session = server
        .get(&format!("/api/sessions/{id}"))
        .await
        .json::<SessionResponse>();
    assert_eq!(session.table.rows.len(), 2);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let server = test_server();
    let response = server
        .get("/api/sessions/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let id = new_session(&server).await.session_id;
    let deleted = server.delete(&format!("/api/sessions/{id}")).await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);
    let gone = server.get(&format!("/api/sessions/{id}/export")).await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn template_download_is_header_only() {
    let server = test_server();
    let response = server.get("/api/template").await;
    assert_eq!(
        response.text(),
        "TargetObject,TargetObjectAttribute,CalculationLogic,SQLContext\n"
    );
}
