//! Route configuration for the record REST API.
//!
//! This module maps every configured endpoint's routes to handlers.

pub mod endpoint_routes;

pub use endpoint_routes::{build_route_table, create_routes};
