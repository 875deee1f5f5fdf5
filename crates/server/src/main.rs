//! pidrest server
//!
//! Serves PID-addressed JSON records over HTTP.

use clap::Parser;
use pidrest_rest::{
    ComponentRegistry, ServerConfig, build_endpoints, create_app_with_config, default_endpoints,
    init_logging, load_endpoints_file,
};
use tracing::info;

#[cfg(feature = "sqlite")]
use pidrest_persistence::backends::sqlite::SqliteBackend;

/// Creates and initializes a SQLite backend from the server configuration.
#[cfg(feature = "sqlite")]
fn create_sqlite_backend(config: &ServerConfig) -> anyhow::Result<SqliteBackend> {
    let backend = match config.database_url.as_deref() {
        Some(path) if !config.is_in_memory() => {
            info!(database = %path, "Initializing SQLite backend");
            SqliteBackend::open(path)?
        }
        _ => {
            info!("Initializing in-memory SQLite backend");
            SqliteBackend::in_memory()?
        }
    };
    backend.init_schema()?;
    Ok(backend)
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let raw_endpoints = match &config.endpoints_file {
        Some(path) => load_endpoints_file(path)?,
        None => default_endpoints(),
    };
    let endpoints = build_endpoints(&raw_endpoints, &ComponentRegistry::with_defaults())?;

    info!(
        port = config.port,
        host = %config.host,
        endpoints = endpoints.len(),
        "Starting pidrest server"
    );

    start(config, endpoints).await
}

/// Starts the server with the SQLite backend.
#[cfg(feature = "sqlite")]
async fn start(
    config: ServerConfig,
    endpoints: Vec<std::sync::Arc<pidrest_rest::EndpointConfig>>,
) -> anyhow::Result<()> {
    let backend = create_sqlite_backend(&config)?;
    let app = create_app_with_config(backend, endpoints, config.clone())?;
    serve(app, &config).await
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
async fn start(
    _config: ServerConfig,
    _endpoints: Vec<std::sync::Arc<pidrest_rest::EndpointConfig>>,
) -> anyhow::Result<()> {
    anyhow::bail!(
        "The sqlite backend requires the 'sqlite' feature. \
         Build with: cargo build -p pidrest-server --features sqlite"
    )
}
