//! Endpoint route configuration.
//!
//! Each endpoint contributes its own routes, bound to its own
//! [`EndpointState`]; the routers are merged into one application router
//! with a JSON 404 fallback.

use std::sync::Arc;

use axum::{Router, routing::get};
use pidrest_persistence::core::RecordStore;
use tracing::debug;

use crate::endpoint::{ConfigError, EndpointConfig};
use crate::handlers;
use crate::links::RouteTable;
use crate::state::{AppState, EndpointState};

/// Builds the table of item routes shared by links and redirects.
///
/// # Errors
///
/// `ConfigError::InvalidBaseUrl` when `base_url` is not an absolute URL.
pub fn build_route_table(
    base_url: &str,
    endpoints: &[Arc<EndpointConfig>],
) -> Result<RouteTable, ConfigError> {
    let mut routes = RouteTable::new(base_url).map_err(|e| ConfigError::InvalidBaseUrl {
        url: base_url.to_string(),
        message: e.to_string(),
    })?;
    for endpoint in endpoints {
        routes.insert(endpoint.pid_type(), endpoint.item_route());
    }
    Ok(routes)
}

/// Creates the routes of every endpoint.
///
/// # Routes
///
/// ## Per endpoint
/// - `GET {list_route}` - Search
/// - `POST {list_route}` - Create
/// - `GET {item_route}` - Read
/// - `PUT {item_route}` - Replace
/// - `PATCH {item_route}` - Patch
/// - `DELETE {item_route}` - Delete
/// - `GET {list_route}_options` - Endpoint description (unless disabled)
/// - `GET {list_route}_suggest` - Completion suggestions (when configured)
///
/// Any other path answers 404 with the JSON error body.
pub fn create_routes<S: RecordStore>(
    state: AppState<S>,
    endpoints: &[Arc<EndpointConfig>],
) -> Router {
    endpoints
        .iter()
        .fold(Router::new(), |router, endpoint| {
            router.merge(endpoint_router(EndpointState::new(
                state.clone(),
                Arc::clone(endpoint),
            )))
        })
        .fallback(handlers::fallback_handler)
}

fn endpoint_router<S: RecordStore>(state: EndpointState<S>) -> Router {
    let endpoint = state.endpoint();
    debug!(
        endpoint = endpoint.name(),
        list_route = endpoint.list_route(),
        item_route = endpoint.item_route(),
        "Registering endpoint routes"
    );

    let mut router = Router::new()
        .route(
            endpoint.list_route(),
            get(handlers::search_handler::<S>).post(handlers::create_handler::<S>),
        )
        .route(
            endpoint.item_route(),
            get(handlers::read_handler::<S>)
                .put(handlers::update_handler::<S>)
                .patch(handlers::patch_handler::<S>)
                .delete(handlers::delete_handler::<S>),
        );
    if endpoint.use_options_view() {
        router = router.route(
            &endpoint.options_route(),
            get(handlers::options_handler::<S>),
        );
    }
    if !endpoint.suggesters().is_empty() {
        router = router.route(
            &endpoint.suggest_route(),
            get(handlers::suggest_handler::<S>),
        );
    }
    router.with_state(state)
}
