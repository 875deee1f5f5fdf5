//! # pidrest-rest - PID-addressed record REST API
//!
//! This crate serves JSON records addressed by persistent identifiers (PIDs)
//! over HTTP. Each configured endpoint binds one PID type to a list route
//! and an item route, and provides search, create, read, replace, patch and
//! delete on records, plus an options view and completion suggestions.
//!
//! ## Features
//!
//! - **PID Resolution**: Reserved, deleted and redirected identifiers map to
//!   404, 410 and 301; every other outcome is a record
//! - **Configurable Endpoints**: Serializers, loaders, minters, permission
//!   factories and links factories are named in JSON and resolved at startup
//! - **Optimistic Concurrency**: ETags are record revisions; writes
//!   compare-and-swap the revision inside one transaction
//! - **Search**: Query strings, sort options, facet filters and
//!   aggregations, with `page`/`from` pagination and navigation links
//! - **Content Negotiation**: Per-endpoint media-type tables for responses
//!   and request bodies
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pidrest_rest::{create_app, ServerConfig};
//! use pidrest_persistence::backends::sqlite::SqliteBackend;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::open("records.db")?;
//!     backend.init_schema()?;
//!
//!     // Serves the built-in `recid` endpoint under /records/
//!     let app = create_app(backend)?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Operation | HTTP Method | URL Pattern |
//! |-----------|-------------|-------------|
//! | search | GET | `{list_route}?q=..&sort=..&page=..&size=..` |
//! | create | POST | `{list_route}` |
//! | read | GET | `{item_route}` |
//! | replace | PUT | `{item_route}` |
//! | patch | PATCH | `{item_route}` |
//! | delete | DELETE | `{item_route}` |
//! | options | GET | `{list_route}_options` |
//! | suggest | GET | `{list_route}_suggest?{name}=..` |
//!
//! ## HTTP Headers
//!
//! - `Accept` / `Content-Type` - Content negotiation
//! - `ETag` / `If-Match` - Optimistic locking for writes
//! - `If-None-Match` / `If-Modified-Since` - Conditional reads
//! - `Link` - Record and pagination links
//! - `X-User-Id` / `X-User-Roles` - Caller identity, set by a trusted proxy
//!
//! ## Error Handling
//!
//! Errors are returned as `{"status": n, "message": "..."}`, with a field
//! `errors` list on validation failures:
//!
//! | HTTP Status | Description |
//! |-------------|-------------|
//! | 301 | Identifier redirected |
//! | 400 | Invalid body, pagination, query or patch |
//! | 401 / 403 | Permission denied (anonymous / authenticated) |
//! | 404 | Identifier unknown or unregistered, unknown route |
//! | 406 / 415 | No serializer / loader for the media type |
//! | 410 | Identifier or record deleted |
//! | 412 | Precondition failed |
//! | 500 | Internal server error |
//!
//! ## Architecture
//!
//! - [`error`] - Error types and error responses
//! - [`config`] - Server configuration
//! - [`endpoint`] - Endpoint configuration and the component registry
//! - [`resolver`] - PID resolution
//! - [`permissions`] - Permission factories and the permission gate
//! - [`links`] - Record and pagination links
//! - [`query`] - Search request factory
//! - [`serializers`] - Record and search serializers, loaders
//! - [`state`] - Application and endpoint state
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Conditional requests and content negotiation
//! - [`extractors`] - Identity, query parameter and pagination extractors
//! - [`responses`] - Response header generation
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod links;
pub mod middleware;
pub mod permissions;
pub mod query;
pub mod resolver;
pub mod responses;
pub mod routing;
pub mod serializers;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use endpoint::{
    ComponentRegistry, ConfigError, EndpointConfig, build_endpoints, default_endpoints,
    load_endpoints_file,
};
pub use error::{RestError, RestResult};
pub use state::{AppState, EndpointState};

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::DefaultBodyLimit, http::StatusCode};
use pidrest_persistence::core::RecordStore;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application serving the built-in `recid` endpoint.
///
/// For more control, use [`create_app_with_config`].
///
/// # Example
///
/// ```rust,ignore
/// use pidrest_rest::create_app;
/// use pidrest_persistence::backends::sqlite::SqliteBackend;
///
/// let backend = SqliteBackend::in_memory()?;
/// backend.init_schema()?;
/// let app = create_app(backend)?;
/// ```
pub fn create_app<S: RecordStore>(storage: S) -> Result<Router, ConfigError> {
    let endpoints = build_endpoints(&default_endpoints(), &ComponentRegistry::with_defaults())?;
    create_app_with_config(storage, endpoints, ServerConfig::default())
}

/// Creates the Axum application for validated endpoints.
///
/// # Arguments
///
/// * `storage` - The storage backend to use
/// * `endpoints` - Endpoints built with [`build_endpoints`]
/// * `config` - Server configuration
///
/// # Errors
///
/// `ConfigError::InvalidBaseUrl` when the configured base URL is invalid.
///
/// # Example
///
/// ```rust,ignore
/// use pidrest_rest::{ComponentRegistry, ServerConfig, build_endpoints,
///                    create_app_with_config, load_endpoints_file};
///
/// let raw = load_endpoints_file(Path::new("endpoints.json"))?;
/// let endpoints = build_endpoints(&raw, &ComponentRegistry::with_defaults())?;
/// let app = create_app_with_config(backend, endpoints, ServerConfig::default())?;
/// ```
pub fn create_app_with_config<S: RecordStore>(
    storage: S,
    endpoints: Vec<Arc<EndpointConfig>>,
    config: ServerConfig,
) -> Result<Router, ConfigError> {
    info!(
        backend = storage.backend_name(),
        endpoints = endpoints.len(),
        "Creating REST API server"
    );

    let routes = routing::build_route_table(config.base_url(), &endpoints)?;
    let state = AppState::new(Arc::new(storage), config.clone(), routes);
    let router = routing::create_routes(state, &endpoints);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout),
        ));

    let router = router.layer(DefaultBodyLimit::max(config.max_body_size));
    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    Ok(router.layer(service_builder))
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG`, when set,
/// overrides `level`.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pidrest_rest={level},pidrest_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
