//! # JASS Engine
//!
//! The search-and-storage engine interface that the JASS document layer is
//! built on, plus an in-process implementation.
//!
//! The engine stores JSON documents in named indices. Each index has a
//! mapping describing how fields are typed and analyzed, and settings that
//! carry shard counts and custom analysis chains. The document layer never
//! talks to a concrete engine directly; it goes through [`SearchEngine`].
//!
//! ## Design Principles
//!
//! - Requests and responses are typed; JSON only appears at the edges
//! - Mappings serialize to exactly the engine's wire shape
//! - Engines must be `Send + Sync` for shared use
//! - Errors keep the engine's failure classes so callers can translate them
//!
//! ## Available Engines
//!
//! - [`InMemoryEngine`] - For testing and ephemeral storage
//!
//! ## Example
//!
//! ```rust
//! use jass_engine::{FieldMapping, FieldType, EngineMapping, IndexBody, InMemoryEngine, SearchEngine};
//!
//! let engine = InMemoryEngine::new();
//! let mapping = EngineMapping::strict().with_field("age", FieldMapping::of(FieldType::Long));
//! engine
//!     .create_index("people", &IndexBody::default().with_mappings(mapping))
//!     .unwrap();
//! assert!(engine.index_exists("people").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod analysis;
mod engine;
mod error;
mod mapping;
mod memory;
mod query;
mod selector;
mod settings;

pub use analysis::{
    AnalysisSettings, Analyzer, AnalyzerDef, TokenChars, TokenFilterDef, TokenizerDef,
    LANGUAGE_ANALYZERS,
};
pub use engine::{
    BulkItem, BulkOperation, BulkResponse, Document, EngineOp, HealthStatus, Hit, ScrollPage,
    SearchEngine, SearchRequest, SearchResponse, SourceFilter,
};
pub use error::{EngineError, EngineResult};
pub use mapping::{DynamicMode, EngineMapping, FieldMapping, FieldType, IndexOption};
pub use memory::InMemoryEngine;
pub use query::{BoolQuery, Query, RangeQuery, ScoreMode};
pub use selector::{glob_match, IndexPattern};
pub use settings::{IndexBody, IndexSettings, CREATION_ONLY_SETTINGS, DEFAULT_MAX_RESULT_WINDOW};
