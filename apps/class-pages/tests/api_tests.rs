//! Integration tests for the class-pages HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.
//! Server settings are passed to the router directly, so no test touches
//! the environment.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use class_pages::api::{
    AppState, ErrorResponse, HealthResponse, ImportResponse, ListResponse, SourcesResponse,
    create_router,
};
use class_pages::catalog::MemoryCatalog;
use class_pages::config::ServerConfig;
use class_pages::render::MarkupRenderer;
use class_pages::service::ClassPagesService;
use class_pages_core::{
    Caller, ImportMode, OverrideRow, Overrides, RawEntry, RecordType, SettingsGateway,
    SpellListMatrix, ViewModel,
};
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn raw(value: serde_json::Value) -> RawEntry {
    serde_json::from_value(value).unwrap()
}

fn populated_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_source(
            "srd.classes",
            vec![
                raw(json!({
                    "uuid": "c.wiz", "_id": "wiz", "type": "class", "name": "Wizard",
                    "system": {"identifier": "wizard", "description": {"value": "<p>Arcane.</p>"}}
                })),
                raw(json!({
                    "uuid": "c.clr", "_id": "clr", "type": "class", "name": "Cleric",
                    "system": {"identifier": "cleric"}
                })),
            ],
        )
        .with_source(
            "srd.spells",
            vec![
                raw(json!({
                    "uuid": "s.fb", "_id": "fb", "type": "spell", "name": "Fireball",
                    "system": {"level": 3, "school": "evo"}
                })),
                raw(json!({
                    "uuid": "s.sh", "_id": "sh", "type": "spell", "name": "Shield",
                    "system": {"level": 1, "school": "abj"}
                })),
            ],
        )
}

fn populated_settings() -> SettingsGateway {
    let mut settings = SettingsGateway::new();
    settings
        .set_sources(
            Caller::Privileged,
            RecordType::Class,
            vec!["srd.classes".to_string()],
        )
        .unwrap();
    settings
        .set_sources(
            Caller::Privileged,
            RecordType::Spell,
            vec!["srd.spells".to_string()],
        )
        .unwrap();
    settings
        .import_assignments(
            Caller::Privileged,
            r#"{"wizard": ["s.fb", "s.sh"]}"#,
            ImportMode::Override,
        )
        .unwrap();
    settings
}

fn test_server_config(api_key: Option<&str>) -> ServerConfig {
    ServerConfig {
        api_key: api_key.map(str::to_string),
        rate_limit: 0,
        ..ServerConfig::default()
    }
}

fn build_server(catalog: MemoryCatalog, settings: SettingsGateway, api_key: Option<&str>) -> TestServer {
    let service = ClassPagesService::new(
        Arc::new(catalog),
        Arc::new(MarkupRenderer::new().unwrap()),
        settings,
    );
    let router = create_router(AppState::new(service), &test_server_config(api_key));
    TestServer::new(router).unwrap()
}

/// Create a test server with an empty catalog and no configuration.
fn create_test_server() -> TestServer {
    build_server(MemoryCatalog::new(), SettingsGateway::new(), None)
}

/// Create a test server with two classes, two spells and a wizard list.
fn create_populated_test_server() -> TestServer {
    build_server(populated_catalog(), populated_settings(), None)
}

/// Create a populated test server that requires `api_key` for changes.
fn create_auth_test_server(api_key: &str) -> TestServer {
    build_server(populated_catalog(), populated_settings(), Some(api_key))
}

fn bearer(key: &str) -> HeaderValue {
    format!("Bearer {}", key).parse::<HeaderValue>().unwrap()
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

// =============================================================================
// VIEW ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_view_empty() {
    let server = create_test_server();

    let response = server.get("/view").await;

    response.assert_status_ok();
    let view: ViewModel = response.json();
    assert!(view.is_empty());
    assert!(view.can_configure);
}

#[tokio::test]
async fn test_view_populated() {
    let server = create_populated_test_server();

    let response = server
        .get("/view")
        .add_query_param("class", "wizard")
        .add_query_param("subtab", "spells")
        .await;

    response.assert_status_ok();
    let view: ViewModel = response.json();
    assert_eq!(view.identifier.as_deref(), Some("wizard"));
    assert_eq!(view.classes.len(), 2);
    let markup = view.class.unwrap().description_markup.unwrap();
    assert_eq!(markup, "<p>Arcane.</p>");
    let placed: usize = view.spells.iter().map(|b| b.spells.len()).sum();
    assert_eq!(placed, 2);
}

#[tokio::test]
async fn test_view_filtered_spells() {
    let server = create_populated_test_server();

    let response = server
        .get("/view")
        .add_query_param("class", "wizard")
        .add_query_param("filter", "school:abj")
        .await;

    response.assert_status_ok();
    let view: ViewModel = response.json();
    let names: Vec<_> = view
        .spells
        .iter()
        .flat_map(|b| b.spells.iter().map(|s| s.record.entry.name.clone()))
        .collect();
    assert_eq!(names, vec!["Shield".to_string()]);
    assert!(view.spells.iter().any(|b| b.level == 3 && b.spells.is_empty()));
}

#[tokio::test]
async fn test_view_unknown_class_falls_back() {
    let server = create_populated_test_server();

    let response = server.get("/view").add_query_param("class", "bard").await;

    response.assert_status_ok();
    let view: ViewModel = response.json();
    assert_eq!(view.identifier.as_deref(), Some("cleric"));
}

// =============================================================================
// NAVIGATE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_navigate_action() {
    let server = create_populated_test_server();

    let view: ViewModel = server.get("/view").await.json();
    assert_eq!(view.identifier.as_deref(), Some("cleric"));

    let response = server
        .post("/navigate")
        .json(&json!({
            "state": view.navigation,
            "action": {"action": "next", "scope": "page"}
        }))
        .await;

    response.assert_status_ok();
    let next: ViewModel = response.json();
    assert_eq!(next.identifier.as_deref(), Some("wizard"));
}

#[tokio::test]
async fn test_navigate_stimulus() {
    let server = create_populated_test_server();

    let response = server
        .post("/navigate")
        .json(&json!({
            "stimulus": {"input": "click", "scope": "page", "member": "wizard"}
        }))
        .await;

    response.assert_status_ok();
    let view: ViewModel = response.json();
    assert_eq!(view.identifier.as_deref(), Some("wizard"));
}

#[tokio::test]
async fn test_navigate_unknown_member_rejected() {
    let server = create_populated_test_server();

    let response = server
        .post("/navigate")
        .json(&json!({
            "action": {"action": "jump", "scope": "page", "member": "bard"}
        }))
        .await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("bard"));
}

// =============================================================================
// SPELL LIST ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_lists_filtered() {
    let server = create_populated_test_server();

    let response = server.get("/lists").add_query_param("filter", "level:3").await;

    response.assert_status_ok();
    let matrix: SpellListMatrix = response.json();
    assert_eq!(matrix.rows.len(), 1);
    assert_eq!(matrix.rows[0].name, "Fireball");
    assert_eq!(matrix.rows[0].classes.get("wizard"), Some(&true));
    assert_eq!(matrix.rows[0].classes.get("cleric"), Some(&false));
}

#[tokio::test]
async fn test_set_list_and_toggle() {
    let server = create_populated_test_server();

    let response = server
        .put("/lists/cleric")
        .json(&json!({"uuids": ["s.sh"]}))
        .await;
    response.assert_status_ok();
    let list: ListResponse = response.json();
    assert_eq!(list.uuids, vec!["s.sh".to_string()]);

    let response = server
        .post("/lists/cleric/toggle")
        .json(&json!({"uuid": "s.fb", "member": true}))
        .await;
    response.assert_status_ok();
    let list: ListResponse = response.json();
    assert_eq!(list.class_identifier, "cleric");
    assert_eq!(list.uuids, vec!["s.sh".to_string(), "s.fb".to_string()]);
}

// =============================================================================
// IMPORT / EXPORT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_import_override() {
    let server = create_populated_test_server();

    let response = server
        .post("/import")
        .text(r#"{"cleric": ["s.sh"]}"#)
        .await;

    response.assert_status_ok();
    let imported: ImportResponse = response.json();
    assert_eq!(imported.mode, ImportMode::Override);
    assert_eq!(imported.classes, 1);
    assert!(imported.lists.list("wizard").is_empty());
}

#[tokio::test]
async fn test_import_merge() {
    let server = create_populated_test_server();

    let response = server
        .post("/import")
        .add_query_param("mode", "merge")
        .text(r#"{"wizard": ["s.new"], "cleric": ["s.sh"]}"#)
        .await;

    response.assert_status_ok();
    let imported: ImportResponse = response.json();
    assert_eq!(imported.mode, ImportMode::Merge);
    assert_eq!(imported.lists.list("wizard").len(), 3);
    assert!(imported.lists.list("cleric").is_empty());
}

#[tokio::test]
async fn test_import_malformed_rejected() {
    let server = create_populated_test_server();

    let response = server.post("/import").text(r#"["not", "a", "map"]"#).await;
    response.assert_status_bad_request();

    let response = server
        .post("/import")
        .add_query_param("mode", "append")
        .text("{}")
        .await;
    response.assert_status_bad_request();

    // The persisted lists are untouched.
    let matrix: SpellListMatrix = server.get("/lists").await.json();
    assert!(matrix.rows.iter().all(|r| r.classes.get("wizard") == Some(&true)));
}

#[tokio::test]
async fn test_export_headers() {
    let server = create_populated_test_server();

    let response = server.get("/export").await;

    response.assert_status_ok();
    let content_type = response.header(header::CONTENT_TYPE);
    assert!(content_type.to_str().unwrap().starts_with("application/json"));
    let disposition = response.header(header::CONTENT_DISPOSITION);
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"spell-list-backup-"));
    assert!(disposition.ends_with(".json\""));

    let body: serde_json::Value = serde_json::from_str(&response.text()).unwrap();
    assert_eq!(body, json!({"wizard": ["s.fb", "s.sh"]}));
}

// =============================================================================
// OVERRIDE & SOURCE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_override_roundtrip() {
    let server = create_populated_test_server();

    let response = server
        .put("/overrides/wizard")
        .json(&json!({"label": "Arcane Tradition"}))
        .await;
    response.assert_status_ok();
    let overrides: Overrides = response.json();
    assert_eq!(overrides.label("wizard"), Some("Arcane Tradition"));

    let rows: Vec<OverrideRow> = server.get("/overrides").await.json();
    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Cleric", "Wizard"]);

    let view: ViewModel = server
        .get("/view")
        .add_query_param("class", "wizard")
        .await
        .json();
    assert_eq!(view.subclass_label, "Arcane Tradition");
}

#[tokio::test]
async fn test_sources_roundtrip() {
    let server = create_populated_test_server();

    let response = server
        .put("/sources/subclass")
        .json(&json!({"sources": [" srd.subclasses ", "", "srd.subclasses"]}))
        .await;
    response.assert_status_ok();
    let stored: Vec<String> = response.json();
    assert_eq!(stored, vec!["srd.subclasses".to_string()]);

    let sources: SourcesResponse = server.get("/sources").await.json();
    assert_eq!(
        sources.sources.get(&RecordType::Subclass),
        Some(&vec!["srd.subclasses".to_string()])
    );
    assert_eq!(sources.available, vec!["srd.classes".to_string(), "srd.spells".to_string()]);
}

#[tokio::test]
async fn test_sources_unknown_record_type() {
    let server = create_populated_test_server();

    let response = server
        .put("/sources/monster")
        .json(&json!({"sources": []}))
        .await;

    response.assert_status_bad_request();
}

// =============================================================================
// AUTHENTICATION TESTS
// =============================================================================

#[tokio::test]
async fn test_auth_health_always_allowed() {
    let server = create_auth_test_server("secret-key");

    let response = server
        .get("/health")
        .add_header(header::AUTHORIZATION, bearer("wrong-key"))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_standard_caller_reads() {
    let server = create_auth_test_server("secret-key");

    let response = server.get("/view").await;

    response.assert_status_ok();
    let view: ViewModel = response.json();
    assert!(!view.can_configure);
}

#[tokio::test]
async fn test_auth_standard_caller_cannot_change() {
    let server = create_auth_test_server("secret-key");

    let response = server
        .put("/overrides/wizard")
        .json(&json!({"label": "School"}))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = server.post("/import").text("{}").await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_auth_standard_caller_cannot_read_config() {
    let server = create_auth_test_server("secret-key");

    for path in ["/lists", "/export", "/overrides", "/sources"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server
            .get(path)
            .add_header(header::AUTHORIZATION, bearer("secret-key"))
            .await;
        response.assert_status_ok();
    }
}

#[tokio::test]
async fn test_auth_privileged_caller_changes() {
    let server = create_auth_test_server("secret-key");

    let response = server
        .put("/overrides/wizard")
        .add_header(header::AUTHORIZATION, bearer("secret-key"))
        .json(&json!({"label": "School"}))
        .await;
    response.assert_status_ok();

    let view: ViewModel = server
        .get("/view")
        .add_header(header::AUTHORIZATION, bearer("secret-key"))
        .await
        .json();
    assert!(view.can_configure);
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/view")
        .add_header(header::AUTHORIZATION, bearer("wrong-key"))
        .await;

    response.assert_status_unauthorized();
}

// =============================================================================
// RATE LIMIT TESTS
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_with_retry_after() {
    let service = ClassPagesService::new(
        Arc::new(MemoryCatalog::new()),
        Arc::new(MarkupRenderer::new().unwrap()),
        SettingsGateway::new(),
    );
    let config = ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    };
    let server = TestServer::new(create_router(AppState::new(service), &config)).unwrap();

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .header(header::RETRY_AFTER)
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
}
