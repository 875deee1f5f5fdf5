//! Response formatting for the record REST API.
//!
//! - [`headers`] - response header generation (ETag, Location, etc.)

pub mod headers;

pub use headers::{RecordHeaders, http_date};
