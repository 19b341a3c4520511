//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::SqliteService;

#[derive(Clone)]
pub struct HealthState {
    pub database: Arc<SqliteService>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

pub fn routes(database: Arc<SqliteService>) -> Router<()> {
    Router::new()
        .route("/", get(health))
        .with_state(HealthState { database })
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    let reachable = sqlx::query("SELECT 1")
        .execute(state.database.pool())
        .await
        .map_err(|e| tracing::warn!(error = %e, "Health check query failed"))
        .is_ok();

    let (status, body) = if reachable {
        (
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                database: "ok",
            },
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "degraded",
                version: env!("CARGO_PKG_VERSION"),
                database: "unreachable",
            },
        )
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    async fn database() -> Arc<SqliteService> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Arc::new(SqliteService::from_pool(pool))
    }

    async fn get_health(database: Arc<SqliteService>) -> (StatusCode, serde_json::Value) {
        let response = routes(database)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_ok() {
        let (status, body) = get_health(database().await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_after_close() {
        let database = database().await;
        database.close().await;
        let (status, body) = get_health(database).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["database"], "unreachable");
    }
}
