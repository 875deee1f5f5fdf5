//! SQLite backend implementation.
//!
//! This module provides a SQLite implementation of all storage traits. It
//! supports both in-memory databases (used by the test suites) and
//! file-based databases.
//!
//! # Example
//!
//! ```no_run
//! use pidrest_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE pids (
//!     pid_type TEXT NOT NULL,
//!     pid_value TEXT NOT NULL,
//!     status TEXT NOT NULL,          -- K, R, D or M
//!     object_type TEXT,
//!     object_uuid TEXT,
//!     redirect_type TEXT,
//!     redirect_value TEXT,
//!     created TEXT NOT NULL,
//!     updated TEXT NOT NULL,
//!     PRIMARY KEY (pid_type, pid_value)
//! );
//!
//! CREATE TABLE records (
//!     id TEXT PRIMARY KEY,
//!     index_name TEXT NOT NULL,
//!     revision INTEGER NOT NULL,
//!     payload TEXT NOT NULL,         -- JSON document
//!     created TEXT NOT NULL,
//!     updated TEXT NOT NULL,
//!     is_deleted INTEGER NOT NULL DEFAULT 0
//! );
//!
//! CREATE TABLE sequences (name TEXT PRIMARY KEY, value INTEGER NOT NULL);
//! ```

mod backend;
mod schema;
mod search;
mod storage;
mod transaction;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use transaction::SqliteTransaction;
