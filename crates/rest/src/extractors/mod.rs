//! Axum extractors for request data.
//!
//! - [`Identity`] - caller identity from proxy-set headers
//! - [`QueryParams`] - repeated query parameters in request order
//! - [`PaginationCursor`] - validated `page`/`from`/`size` window

mod identity;
mod pagination;
mod query_params;

pub use identity::{Identity, USER_ID_HEADER, USER_ROLES_HEADER};
pub use pagination::{CursorMode, PaginationCursor};
pub use query_params::QueryParams;
