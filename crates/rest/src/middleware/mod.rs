//! HTTP request preprocessing for the record REST API.
//!
//! - [`content_type`] - content negotiation and loader selection
//! - [`conditional`] - conditional request headers (If-Match, etc.)
//! - [`memento`] - `Accept-Datetime` negotiation

pub mod conditional;
pub mod content_type;
pub mod memento;

pub use conditional::ConditionalHeaders;
pub use memento::AcceptDatetime;
