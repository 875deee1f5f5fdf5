//! Application state for the record REST API.
//!
//! [`AppState`] holds what every endpoint shares: the storage backend, the
//! server configuration and the route table. Each endpoint router gets its
//! own [`EndpointState`], which adds the validated endpoint configuration and
//! its resolver.

use std::sync::Arc;

use pidrest_persistence::core::RecordStore;
use pidrest_persistence::types::PidRef;

use crate::config::ServerConfig;
use crate::endpoint::EndpointConfig;
use crate::links::{LinkContext, Links, RouteTable};
use crate::resolver::PidResolver;

/// Shared application state for the REST API.
///
/// # Type Parameters
///
/// * `S` - The storage backend type (must implement [`RecordStore`])
///
/// # Example
///
/// ```rust,ignore
/// use pidrest_rest::{AppState, ServerConfig};
/// use pidrest_rest::links::RouteTable;
/// use pidrest_persistence::backends::sqlite::SqliteBackend;
/// use std::sync::Arc;
///
/// let backend = SqliteBackend::in_memory()?;
/// let config = ServerConfig::default();
/// let routes = RouteTable::new(config.base_url())?;
/// let state = AppState::new(Arc::new(backend), config, routes);
/// ```
pub struct AppState<S> {
    storage: Arc<S>,
    config: Arc<ServerConfig>,
    routes: Arc<RouteTable>,
}

// S sits behind an Arc and need not be Clone.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: Arc::clone(&self.config),
            routes: Arc::clone(&self.routes),
        }
    }
}

impl<S: RecordStore> AppState<S> {
    /// Creates a new AppState.
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend (wrapped in Arc)
    /// * `config` - Server configuration
    /// * `routes` - Item routes of every endpoint
    pub fn new(storage: Arc<S>, config: ServerConfig, routes: RouteTable) -> Self {
        Self {
            storage,
            config: Arc::new(config),
            routes: Arc::new(routes),
        }
    }

    /// Returns a reference to the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns a clone of the storage Arc.
    pub fn storage_arc(&self) -> Arc<S> {
        Arc::clone(&self.storage)
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the shared route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns a clone of the route table Arc.
    pub fn routes_arc(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes)
    }

    /// Returns the default page size for search results.
    pub fn default_page_size(&self) -> usize {
        self.config.default_page_size
    }
}

/// State of one endpoint's router.
pub struct EndpointState<S> {
    app: AppState<S>,
    endpoint: Arc<EndpointConfig>,
    resolver: Arc<PidResolver>,
}

impl<S> Clone for EndpointState<S> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            endpoint: Arc::clone(&self.endpoint),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<S: RecordStore> EndpointState<S> {
    /// Binds an endpoint to the shared state.
    pub fn new(app: AppState<S>, endpoint: Arc<EndpointConfig>) -> Self {
        let resolver = PidResolver::new(endpoint.pid_type(), app.routes_arc());
        Self {
            app,
            endpoint,
            resolver: Arc::new(resolver),
        }
    }

    /// Returns the storage backend.
    pub fn storage(&self) -> &S {
        self.app.storage()
    }

    /// Returns the endpoint configuration.
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Returns the resolver of the endpoint's PID type.
    pub fn resolver(&self) -> &PidResolver {
        &self.resolver
    }

    /// Returns the shared route table.
    pub fn routes(&self) -> &RouteTable {
        self.app.routes()
    }

    /// Returns the default page size for search results.
    pub fn default_page_size(&self) -> usize {
        self.app.default_page_size()
    }

    /// Builds the links of a record served by this endpoint.
    pub fn record_links(&self, pid: &PidRef) -> Links {
        self.endpoint.links_factory().links(&LinkContext {
            pid,
            routes: self.routes(),
            additional_links: self.endpoint.additional_links(),
        })
    }
}
