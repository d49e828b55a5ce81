//! Health check endpoints for probes and monitoring.

use std::time::Instant;

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

/// Key probed to check cache connectivity.
const CACHE_PROBE_KEY: &str = "__health_check__";

/// Detailed health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// "healthy", "degraded" or "unhealthy"
    pub status: String,
    pub version: String,
    pub subsystems: SubsystemStatus,
}

#[derive(Debug, Serialize)]
pub struct SubsystemStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ComponentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<ComponentStatus>,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ComponentStatus {
    fn new(healthy: bool, failure_message: &str, started: Instant) -> Self {
        Self {
            healthy,
            message: (!healthy).then(|| failure_message.to_string()),
            latency_ms: Some(started.elapsed().as_millis() as u64),
        }
    }
}

/// Full health check with subsystem status.
///
/// A failing database makes the service unhealthy (503). A failing cache
/// only degrades it: room listings fall back to the database.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut subsystems = SubsystemStatus {
        database: None,
        cache: None,
    };

    if let Some(db) = &state.db {
        let start = Instant::now();
        let healthy = db.health_check().await.is_ok();
        subsystems.database = Some(ComponentStatus::new(
            healthy,
            "Database connection failed",
            start,
        ));
    }

    if let Some(cache) = &state.cache {
        let start = Instant::now();
        let healthy = cache.get_bytes(CACHE_PROBE_KEY).await.is_ok();
        subsystems.cache = Some(ComponentStatus::new(
            healthy,
            "Cache connection failed",
            start,
        ));
    }

    let database_ok = subsystems.database.as_ref().is_none_or(|s| s.healthy);
    let cache_ok = subsystems.cache.as_ref().is_none_or(|s| s.healthy);

    let (status, status_code) = match (database_ok, cache_ok) {
        (false, _) => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE),
        (true, false) => ("degraded", StatusCode::OK),
        (true, true) => ("healthy", StatusCode::OK),
    };

    let health = HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subsystems,
    };

    (status_code, Json(health))
}

/// Liveness probe. Always 200 while the process serves requests.
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe. 503 while the database is unreachable.
#[tracing::instrument(name = "health.readiness", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(db) = &state.db
        && db.health_check().await.is_err()
    {
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        db::{DbPool, tests::harness::migrated_sqlite_pool},
        routes::tests::TestApp,
        tests::fakes::FailingCache,
    };

    async fn get(app: &TestApp, uri: &str) -> (StatusCode, Option<Value>) {
        let response = app
            .router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).ok())
    }

    #[tokio::test]
    async fn test_health_without_subsystems() {
        let app = TestApp::new();
        let (status, body) = get(&app, "/health").await;
        let body = body.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["subsystems"].get("database").is_none());
    }

    #[tokio::test]
    async fn test_health_with_database() {
        let mut app = TestApp::new();
        app.state.db = Some(Arc::new(DbPool::from_sqlite(migrated_sqlite_pool().await)));

        let (status, body) = get(&app, "/health").await;
        let body = body.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subsystems"]["database"]["healthy"], true);

        let (status, _) = get(&app, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_closed_database_is_unhealthy() {
        let db = Arc::new(DbPool::from_sqlite(migrated_sqlite_pool().await));
        db.close().await;

        let mut app = TestApp::new();
        app.state.db = Some(db);

        let (status, body) = get(&app, "/health").await;
        let body = body.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["subsystems"]["database"]["healthy"], false);
        assert_eq!(
            body["subsystems"]["database"]["message"],
            "Database connection failed"
        );

        let (status, _) = get(&app, "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = get(&app, "/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failing_cache_is_degraded() {
        let mut app = TestApp::new();
        app.state.cache = Some(Arc::new(FailingCache));

        let (status, body) = get(&app, "/health").await;
        let body = body.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["subsystems"]["cache"]["healthy"], false);
    }
}
