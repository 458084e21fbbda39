//! # JASS Testkit
//!
//! Test utilities for JASS.
//!
//! This crate provides:
//! - Tenant fixtures over an in-memory engine
//! - A manual clock and a flaky connector for connection tests
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jass_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_tenant() {
//!     with_test_tenant(|tenant| {
//!         let docs = tenant.directory("docs");
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::connection::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use connection::*;
pub use fixtures::*;
pub use generators::*;
