//! Common test utilities for REST API testing.
//!
//! This module provides test infrastructure including:
//!
//! - [`harness`] - Test server over an in-memory SQLite backend
//! - [`fixtures`] - Film records and endpoint definitions
//! - [`assertions`] - HTTP response assertions

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
pub mod harness;
