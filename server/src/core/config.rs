use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::resource::Action;
use crate::utils::file::{display_relative, expand_path};

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_DATABASE_URL, DEFAULT_HOST, DEFAULT_PER_PAGE, DEFAULT_PORT,
    MAX_PER_PAGE, SQLITE_MAX_CONNECTIONS,
};

const DEFAULT_PRIMARY_KEY: &str = "id";

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_origins: Option<Vec<String>>,
}

/// Database configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub schema_file: Option<String>,
}

/// Authentication configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub api_key: Option<String>,
    pub public_actions: Option<Vec<Action>>,
}

/// Validation rules per action, as `field -> "rule|rule"` or `field -> [rules]`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RulesFileConfig {
    #[serde(default)]
    pub create: Map<String, Value>,
    #[serde(default)]
    pub update: Map<String, Value>,
}

/// One exposed table
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceFileConfig {
    pub name: String,
    pub table: Option<String>,
    pub primary_key: Option<String>,
    #[serde(default)]
    pub allowed_fields: Vec<String>,
    #[serde(default)]
    pub date_fields: Vec<String>,
    #[serde(default)]
    pub allowed_attributes: Vec<String>,
    #[serde(default)]
    pub hidden: Vec<String>,
    pub per_page: Option<u64>,
    #[serde(default)]
    pub rules: RulesFileConfig,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub resources: Option<Vec<ResourceFileConfig>>,
    #[serde(flatten)]
    pub extra: Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty allows any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub schema_file: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: SQLITE_MAX_CONNECTIONS,
            schema_file: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Key required by protected actions; `None` leaves every action open
    pub api_key: Option<String>,
    pub public_actions: Vec<Action>,
}

#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub name: String,
    pub table: String,
    pub primary_key: String,
    pub allowed_fields: Vec<String>,
    pub date_fields: Vec<String>,
    pub allowed_attributes: Vec<String>,
    pub hidden: Vec<String>,
    pub per_page: u64,
    pub create_rules: Map<String, Value>,
    pub update_rules: Map<String, Value>,
}

impl ResourceConfig {
    fn from_file(file: ResourceFileConfig) -> Result<Self> {
        if !is_valid_resource_name(&file.name) {
            anyhow::bail!(
                "Invalid resource name '{}': use letters, digits, '-' or '_'",
                file.name
            );
        }

        let per_page = file.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 || per_page > MAX_PER_PAGE {
            anyhow::bail!(
                "Resource '{}': per_page must be between 1 and {}",
                file.name,
                MAX_PER_PAGE
            );
        }

        for date_field in &file.date_fields {
            if !file.allowed_fields.contains(date_field) {
                tracing::warn!(
                    resource = %file.name,
                    field = %date_field,
                    "Date field is not in allowed_fields and can never be filtered"
                );
            }
        }

        Ok(Self {
            table: file.table.unwrap_or_else(|| file.name.clone()),
            primary_key: file
                .primary_key
                .unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string()),
            name: file.name,
            allowed_fields: file.allowed_fields,
            date_fields: file.date_fields,
            allowed_attributes: file.allowed_attributes,
            hidden: file.hidden,
            per_page,
            create_rules: file.rules.create,
            update_rules: file.rules.update,
        })
    }
}

fn is_valid_resource_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Whether a bind address listens on every interface
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub resources: Vec<ResourceConfig>,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Local directory config OR CLI-specified config path
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        let file_config = match path {
            Some(path) => {
                let config = FileConfig::load_from_file(&path)?;
                config.warn_unknown_fields();
                tracing::debug!(path = %display_relative(&path), "Config file loaded");
                config
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                FileConfig::default()
            }
        };

        Self::from_layers(cli, file_config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
            cors_origins: file_server.cors_origins.unwrap_or_default(),
        };

        let database = DatabaseConfig {
            url: cli
                .database_url
                .clone()
                .or(file_database.url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: file_database
                .max_connections
                .unwrap_or(SQLITE_MAX_CONNECTIONS),
            schema_file: file_database.schema_file.map(|p| expand_path(&p)),
        };

        // --no-auth wins over any configured key
        let api_key = if cli.no_auth {
            None
        } else {
            cli.api_key
                .clone()
                .or(file_auth.api_key)
                .filter(|k| !k.is_empty())
        };
        let auth = AuthConfig {
            api_key,
            public_actions: file_auth.public_actions.unwrap_or_default(),
        };

        let resources = file_config
            .resources
            .unwrap_or_default()
            .into_iter()
            .map(ResourceConfig::from_file)
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        for resource in &resources {
            if !seen.insert(resource.name.as_str()) {
                anyhow::bail!("Duplicate resource name '{}'", resource.name);
            }
        }

        if resources.is_empty() {
            tracing::warn!("No resources configured; only the health endpoint will be served");
        }

        Ok(Self {
            server,
            database,
            auth,
            resources,
        })
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }
}
