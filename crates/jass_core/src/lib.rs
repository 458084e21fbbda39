//! # JASS Core
//!
//! Schema-governed, multi-tenant document directories over a search engine.
//!
//! This crate provides:
//! - A schema compiler from declarative field schemas to engine mappings
//! - A content-addressed schema registry with canonical hashing
//! - An additive-only migration checker
//! - A naming guard on every index the layer creates or deletes
//! - Document directories binding document types to physical indices
//!
//! ## Design Principles
//!
//! - Every physical name starts with the tenant id and a class prefix
//! - A mapped field keeps its definition forever
//! - Lazy provisioning treats "already exists" as success
//! - Cascading deletes report every failure, not just the first
//!
//! ## Example
//!
//! ```rust
//! use jass_core::{ConnectionProvider, DirectoryRegistry, Settings, WriteOptions};
//! use jass_engine::InMemoryEngine;
//! use std::sync::Arc;
//!
//! let conn = Arc::new(ConnectionProvider::for_engine(Arc::new(InMemoryEngine::new())));
//! let registry = DirectoryRegistry::new(conn, &Settings::default());
//! registry.create().unwrap();
//!
//! let docs = registry.create_directory("docs", None, true).unwrap();
//! let doc = serde_json::json!({"name": "anton"}).as_object().cloned().unwrap();
//! let id = docs.add_document(&doc, WriteOptions::new()).unwrap();
//! assert!(docs.document_exists(&id, Some("default")).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod config;
mod connection;
mod cursor;
mod directory;
mod error;
mod language;
mod tenant;

pub mod migration;
pub mod naming;
pub mod query;
pub mod schema;

pub use config::{
    parse_duration, DirectorySettings, IndexDefaults, SchemaSettings, ScrollSettings, Settings,
};
pub use connection::{
    Clock, ConnectionProvider, EngineConnector, ReconnectPolicy, StaticConnector, SystemClock,
};
pub use cursor::ScrollCursor;
pub use directory::{
    BulkOutcome, DirectoryNames, DirectoryRecord, DirectoryRegistry, DocumentDirectory,
    SearchParams, WriteOptions,
};
pub use error::{CoreError, CoreResult};
pub use language::LanguageManager;
pub use tenant::TenantEnvironment;
