// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "QueryGate";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "querygate.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "QUERYGATE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "QUERYGATE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "QUERYGATE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "QUERYGATE_LOG";

// =============================================================================
// Environment Variables - Database and Auth
// =============================================================================

/// Environment variable for the SQLite connection URL
pub const ENV_DATABASE_URL: &str = "QUERYGATE_DATABASE_URL";

/// Environment variable for the API key checked by the default policy
pub const ENV_API_KEY: &str = "QUERYGATE_API_KEY";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Default log filter when neither env var is set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Prefix under which resources are mounted
pub const API_PREFIX: &str = "/api/v1";

/// Default body limit for API requests (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

// =============================================================================
// SQLite
// =============================================================================

/// Default database URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite://querygate.db";

/// Maximum connections in the pool
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// WAL checkpoint interval in seconds
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Pagination
// =============================================================================

/// Page size when neither the request nor the resource sets one
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Largest page size a request may ask for
pub const MAX_PER_PAGE: u64 = 500;

/// Query parameters consumed by the controller rather than the filter translator
pub const PAGINATION_PARAMS: &[&str] = &["page", "per_page", "include"];

// =============================================================================
// Shutdown
// =============================================================================

/// Graceful shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
