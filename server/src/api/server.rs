//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::openapi::{openapi_json, swagger_ui_html};
use super::resource::{self, Resource};
use super::routes::health;
use crate::core::CoreApp;
use crate::core::config::AppConfig;
use crate::core::constants::{API_PREFIX, DEFAULT_BODY_LIMIT};
use crate::data::SqliteService;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        let shutdown = app.shutdown.clone();
        let router = build_router(&app.config, app.database.clone())?;

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!(%addr, resources = app.config.resources.len(), "Server listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}

/// Build the full router: health, docs and one nested router per resource
pub fn build_router(config: &AppConfig, database: Arc<SqliteService>) -> Result<Router> {
    let store = database.store();

    let mut router = Router::new()
        .nest(&format!("{}/health", API_PREFIX), health::routes(database))
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/docs", get(swagger_ui_html));

    for resource_config in &config.resources {
        let resource = Resource::from_config(resource_config, &config.auth).with_context(|| {
            format!("Invalid validation rules for resource '{}'", resource_config.name)
        })?;
        let path = format!("{}/{}", API_PREFIX, resource.name);
        tracing::debug!(%path, table = %resource.table.name, "Mounting resource");
        router = router.nest(&path, resource::routes(Arc::new(resource), store.clone()));
    }

    Ok(router
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(middleware::cors(&config.server.cors_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AuthConfig, DatabaseConfig, ResourceConfig, ServerConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Map, Value, json};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    async fn database() -> Arc<SqliteService> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(
            "CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL);
             INSERT INTO books (title) VALUES ('Dune'), ('Emma');",
        )
        .execute(&pool)
        .await
        .unwrap();
        Arc::new(SqliteService::from_pool(pool))
    }

    fn config(create_rules: Map<String, Value>) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: Vec::new(),
            },
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            resources: vec![ResourceConfig {
                name: "books".to_string(),
                table: "books".to_string(),
                primary_key: "id".to_string(),
                allowed_fields: vec!["title".to_string()],
                date_fields: Vec::new(),
                allowed_attributes: Vec::new(),
                hidden: Vec::new(),
                per_page: 15,
                create_rules,
                update_rules: Map::new(),
            }],
        }
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_resources_mounted_under_prefix() {
        let router = build_router(&config(Map::new()), database().await).unwrap();
        let (status, body) = get(router.clone(), "/api/v1/books?title_starts_with=Du").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["title"], "Dune");
        assert_eq!(body["meta"]["pagination"]["total"], 1);

        let (status, body) = get(router.clone(), "/api/v1/books/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Emma");

        let (status, body) = get(router.clone(), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, _) = get(router, "/api/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_envelope() {
        let router = build_router(&config(Map::new()), database().await).unwrap();
        let (status, body) = get(router, "/api/v1/authors").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "GEN-NOT-FOUND");
    }

    #[tokio::test]
    async fn test_invalid_rules_fail_startup() {
        let rules = json!({"title": "required|unique"});
        let result = build_router(
            &config(rules.as_object().unwrap().clone()),
            database().await,
        );
        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("Unknown validation rule 'unique'"));
    }
}
