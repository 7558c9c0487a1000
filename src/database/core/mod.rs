//! Core database infrastructure
//!
//! This module provides the foundational database components used by the
//! relational opacity store:
//! - `DatabaseConn`: Core SQLite connection wrapper with configuration
//! - `SchemaManager`: Schema initialization and management
//! - `SchemaStatus`: Schema state enumeration
//! - `blob`: Encoding of `f64` arrays into SQLite blobs

pub mod blob;
mod connection;
mod schema;

pub use connection::DatabaseConn;
pub use schema::{SchemaDefinitions, SchemaManager, SchemaStatus, REQUIRED_TABLES, SCHEMA_VERSION};
