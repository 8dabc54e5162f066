#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use workshop_api::{
    config::AppConfig,
    db::{self, DbConfig},
    events,
    handlers::BRANCH_HEADER,
    AppState,
};

/// Test harness: application state and router backed by an in-memory SQLite
/// database. A single pooled connection keeps the in-memory database shared.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub branch_id: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let db_config = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(64);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, Some(Arc::new(event_sender)));
        let router = workshop_api::app_router(state.clone());

        Self {
            router,
            state,
            branch_id: Uuid::new_v4(),
            _event_task: event_task,
        }
    }

    /// Sends a request scoped to the harness's default branch.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        self.request_for_branch(self.branch_id, method, uri, body)
            .await
    }

    /// Sends a request scoped to an explicit branch.
    pub async fn request_for_branch(
        &self,
        branch_id: Uuid,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(BRANCH_HEADER, branch_id.to_string());

        let request = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                builder
                    .body(Body::from(serde_json::to_vec(&json).expect("encode body")))
                    .expect("build request")
            }
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("route request")
    }

    /// Sends a request with no branch header at all.
    pub async fn request_unscoped(&self, method: Method, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("route request")
    }
}

/// Collects a response body into JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
