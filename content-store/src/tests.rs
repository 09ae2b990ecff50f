use crate::{DocumentStore, NotionStore, RecordQuery, SeenRegistry, SqliteSeenRegistry};
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{patch, post};
use axum::{Json, Router};
use chrono::Utc;
use outreach_core::{
    ContentRecord, CoreError, ErrorExt, NotionConfig, PageId, RecordStatus, RecordType, StoreError,
};
use serde_json::{json, Value};

#[tokio::test]
async fn test_sqlite_registry_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("seen.db").display());

    let registry = SqliteSeenRegistry::connect(&url).await.unwrap();
    registry.mark_seen("abc123").await.unwrap();
    drop(registry);

    let reopened = SqliteSeenRegistry::connect(&url).await.unwrap();
    assert!(reopened.has_seen("abc123").await.unwrap());
    assert_eq!(reopened.len().await.unwrap(), 1);
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer secret_good")
        && headers.get("notion-version").is_some()
}

async fn create_page(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"code": "unauthorized"})));
    }
    assert_eq!(body["parent"]["database_id"], "db-1");
    assert!(body["children"].as_array().map_or(false, |c| !c.is_empty()));
    (StatusCode::OK, Json(json!({"id": "page-1"})))
}

async fn query_database(
    Path(database_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    assert_eq!(database_id, "db-1");
    assert_eq!(body["sorts"][0]["direction"], "descending");
    let page = json!({
        "id": "page-1",
        "properties": {
            "Title": {"title": [{"plain_text": "Solana wallet data guide"}]},
            "Type": {"select": {"name": "blog_post"}},
            "Status": {"select": {"name": "generated"}},
            "Priority": {"number": 70},
            "Difficulty": {"number": 35},
            "Traffic Potential": {"number": 1200},
            "Keywords": {"multi_select": [{"name": "wallet api"}]},
            "URL": {"url": null},
            "Created": {"date": {"start": "2024-05-01T10:00:00+00:00"}}
        }
    });
    (StatusCode::OK, Json(json!({"results": [page, {"id": "broken"}]})))
}

async fn update_page(Path(page_id): Path<String>) -> (StatusCode, Json<Value>) {
    if page_id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"code": "object_not_found"})));
    }
    (StatusCode::OK, Json(json!({"id": page_id})))
}

async fn spawn_notion() -> String {
    let app = Router::new()
        .route("/v1/pages", post(create_page))
        .route("/v1/pages/:page_id", patch(update_page))
        .route("/v1/databases/:database_id/query", post(query_database));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn config(base: &str, key: &str) -> NotionConfig {
    NotionConfig {
        api_key: Some(key.to_string()),
        database_id: Some("db-1".to_string()),
        base_url: base.to_string(),
        timeout_secs: 5,
        ..NotionConfig::default()
    }
}

fn record() -> ContentRecord {
    ContentRecord {
        title: "Solana wallet data guide".to_string(),
        record_type: RecordType::BlogPost,
        priority: 70,
        status: RecordStatus::Generated,
        keywords: vec!["wallet api".to_string()],
        body: "Intro paragraph.\n\nMore detail.".to_string(),
        difficulty: 35,
        traffic_potential: 1200,
        url: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_notion_create_query_update() {
    let base = spawn_notion().await;
    let store = NotionStore::new(&config(&base, "secret_good")).unwrap();

    let page_id = store.create(&record()).await.unwrap();
    assert_eq!(page_id, PageId("page-1".to_string()));

    let query = RecordQuery::new(RecordType::BlogPost, RecordStatus::Generated, 5);
    let results = store.query(&query).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.title, "Solana wallet data guide");
    assert_eq!(results[0].record.traffic_potential, 1200);

    store
        .update_status(&page_id, RecordStatus::ReadyToPublish)
        .await
        .unwrap();
    let missing = store
        .update_status(&PageId("missing".to_string()), RecordStatus::ReadyToPublish)
        .await;
    assert!(matches!(
        missing,
        Err(CoreError::Store(StoreError::RecordNotFound { .. }))
    ));
}

#[tokio::test]
async fn test_notion_rejected_token_is_credential_error() {
    let base = spawn_notion().await;
    let store = NotionStore::new(&config(&base, "secret_bad")).unwrap();

    let error = store.create(&record()).await.unwrap_err();
    assert!(matches!(
        error,
        CoreError::Store(StoreError::AuthenticationFailed { .. })
    ));
    assert!(error.is_credential_error());
    assert!(!error.is_retryable());
}
