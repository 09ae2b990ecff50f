//! HTTP surface: health check, manual pipeline triggers and cache clearing.

pub mod errors;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use background_service::Orchestrator;
use outreach_core::CoreError;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/trigger/reddit", post(routes::trigger_reddit))
        .route("/trigger/reddit/backfill", post(routes::trigger_backfill))
        .route("/trigger/blog", post(routes::trigger_blog))
        .route("/trigger/social", post(routes::trigger_social))
        .route("/trigger/all", post(routes::trigger_all))
        .route("/cache/clear", post(routes::clear_cache))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), CoreError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Control API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use background_service::{Collaborators, NoopNotifier};
    use content_store::{
        DocumentStore, InMemoryDocumentStore, InMemorySeenRegistry, RecordQuery, SeenRegistry,
    };
    use llm_interface::GenerationChain;
    use outreach_core::{
        AppConfig, ContentRecord, PageId, RawPost, RecordStatus, StoreError, StoredRecord,
    };
    use source_client::{FetchQuery, PostSource};
    use tower::ServiceExt;

    struct EmptySource;

    #[async_trait]
    impl PostSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        async fn fetch(&self, _query: &FetchQuery) -> Result<Vec<RawPost>, CoreError> {
            Ok(Vec::new())
        }
    }

    /// Store whose queries always fail, so the social pipeline errors.
    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn create(&self, _record: &ContentRecord) -> Result<PageId, CoreError> {
            Err(StoreError::ServerError { status_code: 500 }.into())
        }

        async fn query(&self, _query: &RecordQuery) -> Result<Vec<StoredRecord>, CoreError> {
            Err(StoreError::InvalidResponse {
                details: "no results".to_string(),
            }
            .into())
        }

        async fn update_status(&self, _page_id: &PageId, _status: RecordStatus) -> Result<(), CoreError> {
            Ok(())
        }
    }

    fn app_with(store: Arc<dyn DocumentStore>, seen: Arc<InMemorySeenRegistry>) -> Router {
        let mut config = AppConfig::default();
        config.discovery.call_delay_ms = 0;
        config.hackernews.enabled = false;
        config.notion.retry_base_delay_ms = 1;

        let deps = Collaborators {
            reddit: Arc::new(EmptySource),
            hackernews: None,
            generator: Arc::new(GenerationChain::from_config(&config.generation)),
            store,
            seen,
            notifier: Arc::new(NoopNotifier),
        };
        router(AppState {
            orchestrator: Arc::new(Orchestrator::new(&config, deps)),
        })
    }

    fn app() -> Router {
        app_with(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemorySeenRegistry::new()),
        )
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (status, json) = send(app(), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "control-api");
    }

    #[tokio::test]
    async fn trigger_reddit_returns_report() {
        let (status, json) = send(app(), "POST", "/trigger/reddit").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["pipeline"], "reddit");
        assert_eq!(json["status"], "success");
        assert_eq!(json["counters"]["dispatched"], 0);
        assert!(json["run_id"].is_string());
    }

    #[tokio::test]
    async fn trigger_backfill_and_blog() {
        let (status, json) = send(app(), "POST", "/trigger/reddit/backfill").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["pipeline"], "reddit_backfill");

        let (status, json) = send(app(), "POST", "/trigger/blog").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["counters"]["persisted"], 1);
    }

    #[tokio::test]
    async fn failed_run_is_500() {
        let app = app_with(Arc::new(BrokenStore), Arc::new(InMemorySeenRegistry::new()));
        let (status, json) = send(app, "POST", "/trigger/social").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["status"], "error");
        assert!(json["message"].as_str().unwrap().starts_with("social run failed"));
    }

    #[tokio::test]
    async fn trigger_all_reports_stages() {
        let (status, json) = send(app(), "POST", "/trigger/all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["stages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cache_clear_empties_registry() {
        let seen = Arc::new(InMemorySeenRegistry::new());
        seen.mark_seen("abc123").await.unwrap();
        let app = app_with(Arc::new(InMemoryDocumentStore::new()), seen.clone());

        let (status, json) = send(app, "POST", "/cache/clear").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(seen.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/trigger/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
