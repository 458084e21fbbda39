//! Declarative schemas: parsing, compilation, hashing and registration.
//!
//! A raw schema is parsed once into a [`SchemaDefinition`], compiled into an
//! engine mapping by [`SchemaCompiler`], and registered content-addressed in
//! the tenant's [`SchemaRegistry`].

mod canonical;
mod compiler;
mod definition;
mod registry;

pub use canonical::{
    canonicalize, hash_mapping, hash_schema_identity, hash_value, MAX_CANONICAL_DEPTH,
};
pub use compiler::{
    search_mode_analysis, SchemaCompiler, AUTOCOMPLETE_ANALYZER, AUTOCOMPLETE_SEARCH_ANALYZER,
    NGRAM_ANALYZER, PATH_ANALYZER,
};
pub use definition::{JsonType, SchemaDefinition, SchemaFieldSpec, SearchBinding, SearchMode};
pub use registry::{SchemaMetadata, SchemaQuery, SchemaRegistry, SchemaRegistryEntry};
