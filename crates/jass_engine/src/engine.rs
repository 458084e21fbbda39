//! The search engine interface.

use crate::error::{EngineError, EngineResult};
use crate::mapping::EngineMapping;
use crate::query::Query;
use crate::settings::{IndexBody, IndexSettings};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// A stored document body.
pub type Document = Map<String, Value>;

/// Cluster health, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthStatus {
    /// Some primary shards are unassigned.
    Red,
    /// All primaries are assigned, some replicas are not.
    Yellow,
    /// Every shard is assigned.
    Green,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthStatus::Red => "red",
            HealthStatus::Yellow => "yellow",
            HealthStatus::Green => "green",
        })
    }
}

/// Which parts of the stored source a hit carries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceFilter {
    /// The whole source.
    #[default]
    All,
    /// Only the listed field paths.
    Fields(Vec<String>),
}

/// A bounded search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Query to evaluate.
    pub query: Query,
    /// Source projection.
    pub source: SourceFilter,
    /// Offset of the first hit.
    pub from: usize,
    /// Maximum number of hits (page size for cursors).
    pub size: usize,
}

impl SearchRequest {
    /// Creates a request for the first `size` hits of `query`.
    #[must_use]
    pub fn new(query: Query, size: usize) -> Self {
        Self {
            query,
            source: SourceFilter::All,
            from: 0,
            size,
        }
    }

    /// Sets the source projection.
    #[must_use]
    pub fn with_source(mut self, source: SourceFilter) -> Self {
        self.source = source;
        self
    }

    /// Sets the offset.
    #[must_use]
    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }
}

/// A matching document.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Index holding the document.
    pub index: String,
    /// Document id.
    pub id: String,
    /// Projected source.
    pub source: Document,
}

/// Result of a bounded search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResponse {
    /// Total number of matches, beyond the returned page.
    pub total: usize,
    /// The returned page.
    pub hits: Vec<Hit>,
}

/// One page of a cursor traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPage {
    /// Cursor to pass to the next `scroll` call.
    pub cursor_id: String,
    /// Total number of matches.
    pub total: usize,
    /// This page; empty once the traversal is exhausted.
    pub hits: Vec<Hit>,
}

/// A single write in a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Insert, failing if the id exists.
    Create {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// Document body.
        source: Document,
    },
    /// Insert or replace.
    Index {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// Document body.
        source: Document,
    },
    /// Partial merge onto an existing document.
    Update {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// Fields to merge.
        doc: Document,
    },
    /// Removal.
    Delete {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
    },
}

impl BulkOperation {
    /// Target index.
    #[must_use]
    pub fn index(&self) -> &str {
        match self {
            BulkOperation::Create { index, .. }
            | BulkOperation::Index { index, .. }
            | BulkOperation::Update { index, .. }
            | BulkOperation::Delete { index, .. } => index,
        }
    }

    /// Target document id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            BulkOperation::Create { id, .. }
            | BulkOperation::Index { id, .. }
            | BulkOperation::Update { id, .. }
            | BulkOperation::Delete { id, .. } => id,
        }
    }
}

/// Outcome of one bulk item.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItem {
    /// Target index.
    pub index: String,
    /// Document id.
    pub id: String,
    /// The item's error, if it failed.
    pub error: Option<EngineError>,
}

/// Outcome of a bulk request, one item per operation in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkResponse {
    /// Per-operation outcomes.
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    /// Returns true if any item failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| item.error.is_some())
    }
}

/// Engine operation classes, used to target injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    /// `cluster_health`.
    Health,
    /// `index_exists`.
    IndexExists,
    /// `create_index`.
    CreateIndex,
    /// `delete_index`.
    DeleteIndex,
    /// `get_settings` and `get_mapping`.
    ReadMetadata,
    /// `put_mapping`.
    PutMapping,
    /// Single-document writes.
    Write,
    /// Single-document reads.
    Read,
    /// `search`.
    Search,
    /// Cursor calls.
    Scroll,
    /// `bulk`.
    Bulk,
}

/// A search-and-storage engine.
///
/// Index selectors accept comma separated names and trailing `*` patterns.
/// Concrete names in a selector must exist; patterns may match nothing.
///
/// # Implementors
///
/// - [`crate::InMemoryEngine`] - In-process engine for tests and ephemeral use
pub trait SearchEngine: Send + Sync {
    /// Waits for the cluster to reach `wait_for`.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the status is not reached within `timeout`.
    fn cluster_health(&self, wait_for: HealthStatus, timeout: Duration)
        -> EngineResult<HealthStatus>;

    /// Returns true if the index exists.
    fn index_exists(&self, index: &str) -> EngineResult<bool>;

    /// Creates an index.
    ///
    /// # Errors
    ///
    /// Returns `IndexAlreadyExists`, `InvalidIndexName`, or
    /// `IllegalArgument` for settings that may not be set explicitly.
    fn create_index(&self, index: &str, body: &IndexBody) -> EngineResult<()>;

    /// Deletes every index the selector names, returning the deleted names.
    fn delete_index(&self, selector: &str) -> EngineResult<Vec<String>>;

    /// Returns the settings of an index, creation-time keys included.
    fn get_settings(&self, index: &str) -> EngineResult<IndexSettings>;

    /// Returns the mapping of an index.
    fn get_mapping(&self, index: &str) -> EngineResult<EngineMapping>;

    /// Merges new fields into the mapping of an index.
    ///
    /// # Errors
    ///
    /// Returns `MappingConflict` if an existing field would change.
    fn put_mapping(&self, index: &str, mapping: &EngineMapping) -> EngineResult<()>;

    /// Inserts a document, failing with `VersionConflict` if the id exists.
    fn create_document(&self, index: &str, id: &str, source: &Document) -> EngineResult<()>;

    /// Inserts or replaces a document.
    fn index_document(&self, index: &str, id: &str, source: &Document) -> EngineResult<()>;

    /// Deep-merges fields onto an existing document.
    fn update_document(&self, index: &str, id: &str, partial: &Document) -> EngineResult<()>;

    /// Reads a document.
    fn get_document(&self, index: &str, id: &str) -> EngineResult<Option<Document>>;

    /// Deletes a document, failing with `DocumentNotFound` if absent.
    fn delete_document(&self, index: &str, id: &str) -> EngineResult<()>;

    /// Runs a bounded search.
    fn search(&self, selector: &str, request: &SearchRequest) -> EngineResult<SearchResponse>;

    /// Opens a cursor traversal; `request.size` is the page size.
    fn open_scroll(
        &self,
        selector: &str,
        request: &SearchRequest,
        keep_alive: Duration,
    ) -> EngineResult<ScrollPage>;

    /// Fetches the next page of a cursor and extends its lifetime.
    fn scroll(&self, cursor_id: &str, keep_alive: Duration) -> EngineResult<ScrollPage>;

    /// Releases a cursor.
    fn clear_scroll(&self, cursor_id: &str) -> EngineResult<()>;

    /// Applies several writes, reporting each outcome.
    fn bulk(&self, operations: &[BulkOperation]) -> EngineResult<BulkResponse>;
}
