use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Server configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// Postgres connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub database_url: String,

    /// Namespaces whose relations are exposed over HTTP
    #[validate(length(min = 1, message = "At least one schema must be exposed"))]
    pub schemas: Vec<String>,

    /// Number of pooled database connections
    #[validate(range(min = 1, max = 64, message = "Pool size must be between 1 and 64"))]
    pub pool_size: usize,

    /// How long a request may wait for a pooled connection, in seconds
    #[validate(range(
        min = 1,
        max = 300,
        message = "Acquire timeout must be between 1 and 300 seconds"
    ))]
    pub acquire_timeout_secs: u64,

    /// Whole-request deadline, in seconds
    #[validate(range(
        min = 1,
        max = 3600,
        message = "Request timeout must be between 1 and 3600 seconds"
    ))]
    pub request_timeout_secs: u64,

    /// Server-side cap applied to every query's `limit`, when set
    #[validate(range(min = 1, message = "Max limit must be at least 1"))]
    pub max_limit: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            database_url: "postgres://localhost:5432/postgres".to_string(),
            schemas: vec!["public".to_string()],
            pool_size: 8,
            acquire_timeout_secs: 5,
            request_timeout_secs: 30,
            max_limit: None,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            http_host: env::var("PGLENS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("PGLENS_PORT", "8080")?,
            database_url: default_database_url(),
            schemas: parse_schemas(&env::var("PGLENS_SCHEMAS").unwrap_or_default()),
            pool_size: parse_env_var("PGLENS_POOL_SIZE", "8")?,
            acquire_timeout_secs: parse_env_var("PGLENS_ACQUIRE_TIMEOUT_SECS", "5")?,
            request_timeout_secs: parse_env_var("PGLENS_REQUEST_TIMEOUT_SECS", "30")?,
            max_limit: parse_optional_env_var("PGLENS_MAX_LIMIT")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            http_host: cli.http_host,
            http_port: cli.http_port,
            database_url: cli.database_url.unwrap_or_else(default_database_url),
            schemas: if cli.schemas.is_empty() {
                vec!["public".to_string()]
            } else {
                cli.schemas
            },
            pool_size: cli.pool_size,
            acquire_timeout_secs: cli.acquire_timeout_secs,
            request_timeout_secs: cli.request_timeout_secs,
            max_limit: cli.max_limit,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file. Missing keys take their
    /// default values.
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Merge with another configuration (the other side wins)
    pub fn merge(&mut self, other: Self) {
        self.http_host = other.http_host;
        self.http_port = other.http_port;
        self.database_url = other.database_url;
        self.schemas = other.schemas;
        self.pool_size = other.pool_size;
        self.acquire_timeout_secs = other.acquire_timeout_secs;
        self.request_timeout_secs = other.request_timeout_secs;
        self.max_limit = other.max_limit;
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub http_host: String,
    pub http_port: u16,
    /// `None` falls back to `PGLENS_DATABASE_URL`, then `DATABASE_URL`.
    pub database_url: Option<String>,
    /// Empty means the default, a single `public`.
    pub schemas: Vec<String>,
    pub pool_size: usize,
    pub acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_limit: Option<u64>,
}

fn default_database_url() -> String {
    env::var("PGLENS_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .unwrap_or_else(|_| "postgres://localhost:5432/postgres".to_string())
}

/// Split a comma-separated schema list, dropping blanks. An empty input
/// means the default, a single `public`.
fn parse_schemas(value: &str) -> Vec<String> {
    let schemas: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if schemas.is_empty() {
        vec!["public".to_string()]
    } else {
        schemas
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

/// Parse an environment variable that has no default
fn parse_optional_env_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::Parse {
                field: key.to_string(),
                value,
                source: Box::new(e),
            }),
        Err(_) => Ok(None),
    }
}
