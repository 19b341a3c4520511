//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::Uri;

use crate::api::ApiServer;
use crate::api::resource::Resource;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::SqliteService;
use crate::data::filters::{QueryParameters, Translation};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub database: Arc<SqliteService>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Translate { resource, query }) => {
                let config = AppConfig::load(&cli_config)?;
                let translation = translate_query(&config, &resource, &query)?;
                println!("{}", serde_json::to_string_pretty(&translation)?);
                Ok(())
            }
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let database = Arc::new(
            SqliteService::init(&config.database)
                .await
                .with_context(|| format!("Failed to open database {}", config.database.url))?,
        );
        let shutdown = ShutdownService::new(database.clone());

        Ok(Self {
            shutdown,
            config,
            database,
        })
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.shutdown
            .register(app.database.start_checkpoint_task(app.shutdown.subscribe()))
            .await;

        banner::print_banner(&app.config);

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}

/// Translate a raw query string the way the index endpoint of `resource` would
pub fn translate_query(config: &AppConfig, resource: &str, query: &str) -> Result<Translation> {
    let resource_config = config
        .resource(resource)
        .with_context(|| format!("Unknown resource '{}'", resource))?;
    let resource = Resource::from_config(resource_config, &config.auth)?;

    let uri: Uri = format!("/?{}", query.trim_start_matches('?'))
        .parse()
        .with_context(|| format!("Invalid query string: {}", query))?;
    let params = QueryParameters::from_uri(&uri).context("Invalid query string")?;

    Ok(resource.translate(&params)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AuthConfig, DatabaseConfig, ResourceConfig, ServerConfig};
    use crate::data::filters::{ClauseValue, FilterError, Predicate};
    use serde_json::Map;

    fn config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: Vec::new(),
            },
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            resources: vec![ResourceConfig {
                name: "users".to_string(),
                table: "users".to_string(),
                primary_key: "id".to_string(),
                allowed_fields: vec!["name".to_string(), "created_at".to_string()],
                date_fields: vec!["created_at".to_string()],
                allowed_attributes: Vec::new(),
                hidden: Vec::new(),
                per_page: 15,
                create_rules: Map::new(),
                update_rules: Map::new(),
            }],
        }
    }

    #[test]
    fn test_translate_query() {
        let translation = translate_query(&config(), "users", "?name_contains=jo&page=2").unwrap();
        assert_eq!(translation.clauses.len(), 1);
        assert_eq!(translation.clauses[0].field, "name");
        assert!(matches!(
            &translation.clauses[0].predicate,
            Predicate::Compare { value: ClauseValue::Text(v), .. } if v == "%jo%"
        ));
    }

    #[test]
    fn test_translate_query_unknown_resource() {
        let err = translate_query(&config(), "posts", "name=x").unwrap_err();
        assert!(err.to_string().contains("Unknown resource 'posts'"));
    }

    #[test]
    fn test_translate_query_bad_date() {
        let err = translate_query(&config(), "users", "created_at=soon").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FilterError>(),
            Some(FilterError::InvalidDateFormat { .. })
        ));
    }
}
