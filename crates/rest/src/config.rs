//! Server configuration for the record REST API.
//!
//! This module provides configuration types for the REST server, supporting
//! both programmatic configuration and environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PIDREST_SERVER_PORT` | 8080 | Server port |
//! | `PIDREST_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `PIDREST_LOG_LEVEL` | info | Log level |
//! | `PIDREST_MAX_BODY_SIZE` | 10485760 | Max request body (bytes) |
//! | `PIDREST_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `PIDREST_ENABLE_CORS` | true | Enable CORS |
//! | `PIDREST_CORS_ORIGINS` | * | Allowed origins |
//! | `PIDREST_CORS_METHODS` | GET,POST,PUT,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `PIDREST_CORS_HEADERS` | Content-Type,Accept,If-Match,... | Allowed headers |
//! | `PIDREST_BASE_URL` | http://localhost:8080 | Base URL of generated links |
//! | `PIDREST_DATABASE_URL` | (in-memory) | SQLite file path, or `:memory:` |
//! | `PIDREST_ENDPOINTS_FILE` | (built-in `recid` endpoint) | JSON file of endpoint definitions |
//! | `PIDREST_DEFAULT_PAGE_SIZE` | 10 | Search page size when `size` is absent |
//!
//! # Example
//!
//! ```rust
//! use pidrest_rest::ServerConfig;
//!
//! // Create from environment
//! let config = ServerConfig::from_env();
//!
//! // Or create programmatically
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     enable_cors: true,
//!     ..Default::default()
//! };
//! ```

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Server configuration for the record REST API.
///
/// This struct can be constructed from environment variables using [`ServerConfig::from_env`],
/// from command line arguments using [`ServerConfig::parse`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "pidrest")]
#[command(about = "PID-addressed record store over HTTP")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "PIDREST_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "PIDREST_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "PIDREST_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "PIDREST_MAX_BODY_SIZE", default_value = "10485760")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "PIDREST_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "PIDREST_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "PIDREST_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "PIDREST_CORS_METHODS",
        default_value = "GET,POST,PUT,PATCH,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "PIDREST_CORS_HEADERS",
        default_value = "Content-Type,Accept,If-Match,If-None-Match,If-Modified-Since,X-User-Id,X-User-Roles"
    )]
    pub cors_headers: String,

    /// Base URL for the server (used in links and Location headers).
    #[arg(long, env = "PIDREST_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// SQLite database path. In-memory when unset or `:memory:`.
    #[arg(long, env = "PIDREST_DATABASE_URL")]
    pub database_url: Option<String>,

    /// JSON file mapping endpoint names to endpoint definitions.
    #[arg(long, env = "PIDREST_ENDPOINTS_FILE")]
    pub endpoints_file: Option<PathBuf>,

    /// Default page size for search results.
    #[arg(long, env = "PIDREST_DEFAULT_PAGE_SIZE", default_value = "10")]
    pub default_page_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,PATCH,DELETE,OPTIONS".to_string(),
            cors_headers:
                "Content-Type,Accept,If-Match,If-None-Match,If-Modified-Since,X-User-Id,X-User-Roles"
                    .to_string(),
            base_url: "http://localhost:8080".to_string(),
            database_url: None,
            endpoints_file: None,
            default_page_size: 10,
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    ///
    /// This is a convenience method that parses environment variables without
    /// requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Returns true when the database lives in memory.
    pub fn is_in_memory(&self) -> bool {
        self.database_url
            .as_deref()
            .is_none_or(|url| url == ":memory:")
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {}
            Ok(_) => errors.push(format!(
                "Base URL must be an absolute http(s) URL: {}",
                self.base_url
            )),
            Err(e) => errors.push(format!("Invalid base URL '{}': {}", self.base_url, e)),
        }

        if let Some(path) = &self.endpoints_file
            && !path.is_file()
        {
            errors.push(format!("Endpoints file not found: {}", path.display()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// This uses ephemeral port 0 and disables features that might interfere
    /// with tests.
    pub fn for_testing() -> Self {
        Self {
            port: 0, // Let OS assign port
            log_level: "debug".to_string(),
            request_timeout: 5, // Shorter timeout for tests
            enable_cors: false,
            cors_origins: "*".to_string(),
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            base_url: "http://localhost".to_string(),
            ..Default::default()
        }
    }
}
