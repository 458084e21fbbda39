//! In-process search engine.

mod eval;
mod index;

use crate::engine::{
    BulkItem, BulkOperation, BulkResponse, Document, EngineOp, HealthStatus, Hit, ScrollPage,
    SearchEngine, SearchRequest, SearchResponse, SourceFilter,
};
use crate::error::{EngineError, EngineResult};
use crate::mapping::EngineMapping;
use crate::selector::{glob_match, IndexPattern};
use crate::settings::{IndexBody, IndexSettings};
use eval::{project, Evaluator};
use index::{deep_merge, IndexState};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

struct Cursor {
    hits: Vec<Hit>,
    position: usize,
    page_size: usize,
    expires_at: Instant,
}

struct State {
    indices: BTreeMap<String, IndexState>,
    cursors: HashMap<String, Cursor>,
    faults: Vec<(EngineOp, String)>,
    health: HealthStatus,
}

impl Default for State {
    fn default() -> Self {
        Self {
            indices: BTreeMap::new(),
            cursors: HashMap::new(),
            faults: Vec::new(),
            health: HealthStatus::Green,
        }
    }
}

/// An in-memory search engine.
///
/// Implements the whole [`SearchEngine`] contract: index lifecycle with
/// strict and dynamic mappings, analysis chains, bounded search and cursor
/// traversal. Hits come back ordered by index name, then document id.
///
/// Suitable for:
/// - Unit and integration tests
/// - Ephemeral deployments that need no persistence
///
/// Faults can be injected per operation and index to exercise error paths.
///
/// # Example
///
/// ```rust
/// use jass_engine::{InMemoryEngine, IndexBody, Query, SearchEngine, SearchRequest};
/// use serde_json::json;
///
/// let engine = InMemoryEngine::new();
/// engine.create_index("books", &IndexBody::default()).unwrap();
/// let doc = json!({"title": "Dune"}).as_object().unwrap().clone();
/// engine.create_document("books", "1", &doc).unwrap();
///
/// let found = engine
///     .search("books", &SearchRequest::new(Query::matching("title", "dune"), 10))
///     .unwrap();
/// assert_eq!(found.total, 1);
/// ```
#[derive(Default)]
pub struct InMemoryEngine {
    state: RwLock<State>,
}

impl InMemoryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `op` on an index matching `index_pattern` fail with
    /// `Unavailable` until [`clear_faults`](Self::clear_faults).
    pub fn inject_fault(&self, op: EngineOp, index_pattern: &str) {
        self.state.write().faults.push((op, index_pattern.to_string()));
    }

    /// Removes every injected fault.
    pub fn clear_faults(&self) {
        self.state.write().faults.clear();
    }

    /// Sets the reported cluster health.
    pub fn set_health(&self, health: HealthStatus) {
        self.state.write().health = health;
    }

    /// Drops every open cursor, as if their keep-alive had elapsed.
    pub fn expire_cursors(&self) {
        self.state.write().cursors.clear();
    }

    /// Number of cursors still open.
    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.state.read().cursors.len()
    }

    /// Names of all indices, sorted.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        self.state.read().indices.keys().cloned().collect()
    }

    /// Number of documents in an index, if it exists.
    #[must_use]
    pub fn document_count(&self, index: &str) -> Option<usize> {
        self.state.read().indices.get(index).map(|i| i.docs.len())
    }

    fn check_fault(state: &State, op: EngineOp, index: &str) -> EngineResult<()> {
        if state
            .faults
            .iter()
            .any(|(fault_op, pattern)| *fault_op == op && glob_match(pattern, index))
        {
            return Err(EngineError::unavailable(format!(
                "injected fault on {op:?} [{index}]"
            )));
        }
        Ok(())
    }

    fn collect_hits(state: &State, selector: &str, request: &SearchRequest) -> EngineResult<Vec<Hit>> {
        let names = IndexPattern::parse(selector)?.resolve(state.indices.keys())?;
        let mut hits = Vec::new();
        for name in &names {
            let Some(index) = state.indices.get(name) else {
                continue;
            };
            let evaluator = Evaluator::new(&index.mapping, index.settings.analysis.as_ref());
            for (id, doc) in &index.docs {
                if evaluator.matches(&request.query, id, doc)? {
                    hits.push(Hit {
                        index: name.clone(),
                        id: id.clone(),
                        source: project(doc, &request.source),
                    });
                }
            }
        }
        Ok(hits)
    }

    fn write<F>(&self, op: EngineOp, index: &str, apply: F) -> EngineResult<()>
    where
        F: FnOnce(&mut IndexState) -> EngineResult<()>,
    {
        let mut state = self.state.write();
        Self::check_fault(&state, op, index)?;
        let target = state
            .indices
            .get_mut(index)
            .ok_or_else(|| EngineError::index_not_found(index))?;
        apply(target)
    }

    fn apply_bulk(&self, operation: &BulkOperation) -> EngineResult<()> {
        match operation {
            BulkOperation::Create { index, id, source } => self.create_document(index, id, source),
            BulkOperation::Index { index, id, source } => self.index_document(index, id, source),
            BulkOperation::Update { index, id, doc } => self.update_document(index, id, doc),
            BulkOperation::Delete { index, id } => self.delete_document(index, id),
        }
    }

    fn next_page(cursor_id: &str, cursor: &mut Cursor, keep_alive: Duration) -> ScrollPage {
        let end = (cursor.position + cursor.page_size).min(cursor.hits.len());
        let hits = cursor.hits[cursor.position..end].to_vec();
        cursor.position = end;
        cursor.expires_at = Instant::now() + keep_alive;
        ScrollPage {
            cursor_id: cursor_id.to_string(),
            total: cursor.hits.len(),
            hits,
        }
    }
}

impl SearchEngine for InMemoryEngine {
    fn cluster_health(
        &self,
        wait_for: HealthStatus,
        timeout: Duration,
    ) -> EngineResult<HealthStatus> {
        let state = self.state.read();
        Self::check_fault(&state, EngineOp::Health, "")?;
        if state.health >= wait_for {
            Ok(state.health)
        } else {
            Err(EngineError::Timeout(format!(
                "cluster is {} after {timeout:?}, wanted {wait_for}",
                state.health
            )))
        }
    }

    fn index_exists(&self, index: &str) -> EngineResult<bool> {
        let state = self.state.read();
        Self::check_fault(&state, EngineOp::IndexExists, index)?;
        Ok(state.indices.contains_key(index))
    }

    fn create_index(&self, index: &str, body: &IndexBody) -> EngineResult<()> {
        let mut state = self.state.write();
        Self::check_fault(&state, EngineOp::CreateIndex, index)?;
        if state.indices.contains_key(index) {
            return Err(EngineError::IndexAlreadyExists {
                index: index.to_string(),
            });
        }
        let created = IndexState::create(index, body)?;
        state.indices.insert(index.to_string(), created);
        Ok(())
    }

    fn delete_index(&self, selector: &str) -> EngineResult<Vec<String>> {
        let mut state = self.state.write();
        Self::check_fault(&state, EngineOp::DeleteIndex, selector)?;
        let names = IndexPattern::parse(selector)?.resolve(state.indices.keys())?;
        for name in &names {
            state.indices.remove(name);
        }
        Ok(names)
    }

    fn get_settings(&self, index: &str) -> EngineResult<IndexSettings> {
        let state = self.state.read();
        Self::check_fault(&state, EngineOp::ReadMetadata, index)?;
        state
            .indices
            .get(index)
            .map(|i| i.settings.clone())
            .ok_or_else(|| EngineError::index_not_found(index))
    }

    fn get_mapping(&self, index: &str) -> EngineResult<EngineMapping> {
        let state = self.state.read();
        Self::check_fault(&state, EngineOp::ReadMetadata, index)?;
        state
            .indices
            .get(index)
            .map(|i| i.mapping.clone())
            .ok_or_else(|| EngineError::index_not_found(index))
    }

    fn put_mapping(&self, index: &str, mapping: &EngineMapping) -> EngineResult<()> {
        self.write(EngineOp::PutMapping, index, |target| {
            target.put_mapping(index, mapping)
        })
    }

    fn create_document(&self, index: &str, id: &str, source: &Document) -> EngineResult<()> {
        self.write(EngineOp::Write, index, |target| {
            if target.docs.contains_key(id) {
                return Err(EngineError::VersionConflict {
                    index: index.to_string(),
                    id: id.to_string(),
                });
            }
            target.accept(index, source)?;
            target.docs.insert(id.to_string(), source.clone());
            Ok(())
        })
    }

    fn index_document(&self, index: &str, id: &str, source: &Document) -> EngineResult<()> {
        self.write(EngineOp::Write, index, |target| {
            target.accept(index, source)?;
            target.docs.insert(id.to_string(), source.clone());
            Ok(())
        })
    }

    fn update_document(&self, index: &str, id: &str, partial: &Document) -> EngineResult<()> {
        self.write(EngineOp::Write, index, |target| {
            let mut merged = target
                .docs
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::document_not_found(index, id))?;
            deep_merge(&mut merged, partial);
            target.accept(index, &merged)?;
            target.docs.insert(id.to_string(), merged);
            Ok(())
        })
    }

    fn get_document(&self, index: &str, id: &str) -> EngineResult<Option<Document>> {
        let state = self.state.read();
        Self::check_fault(&state, EngineOp::Read, index)?;
        state
            .indices
            .get(index)
            .map(|i| i.docs.get(id).cloned())
            .ok_or_else(|| EngineError::index_not_found(index))
    }

    fn delete_document(&self, index: &str, id: &str) -> EngineResult<()> {
        self.write(EngineOp::Write, index, |target| {
            target
                .docs
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| EngineError::document_not_found(index, id))
        })
    }

    fn search(&self, selector: &str, request: &SearchRequest) -> EngineResult<SearchResponse> {
        let state = self.state.read();
        Self::check_fault(&state, EngineOp::Search, selector)?;

        let names = IndexPattern::parse(selector)?.resolve(state.indices.keys())?;
        let window = names
            .iter()
            .filter_map(|n| state.indices.get(n))
            .map(|i| i.settings.result_window())
            .min()
            .unwrap_or(crate::settings::DEFAULT_MAX_RESULT_WINDOW);
        if request.from + request.size > window {
            return Err(EngineError::illegal_argument(format!(
                "result window is too large, from + size must be less than or equal to: [{window}] but was [{}]",
                request.from + request.size
            )));
        }

        let hits = Self::collect_hits(&state, selector, request)?;
        let total = hits.len();
        let page = hits
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .collect();
        Ok(SearchResponse { total, hits: page })
    }

    fn open_scroll(
        &self,
        selector: &str,
        request: &SearchRequest,
        keep_alive: Duration,
    ) -> EngineResult<ScrollPage> {
        let mut state = self.state.write();
        Self::check_fault(&state, EngineOp::Scroll, selector)?;
        if request.size == 0 {
            return Err(EngineError::illegal_argument("scroll page size must be positive"));
        }

        let hits = Self::collect_hits(&state, selector, request)?;
        let cursor_id = uuid::Uuid::new_v4().simple().to_string();
        let mut cursor = Cursor {
            hits,
            position: 0,
            page_size: request.size,
            expires_at: Instant::now() + keep_alive,
        };
        let page = Self::next_page(&cursor_id, &mut cursor, keep_alive);
        state.cursors.insert(cursor_id, cursor);
        Ok(page)
    }

    fn scroll(&self, cursor_id: &str, keep_alive: Duration) -> EngineResult<ScrollPage> {
        let mut state = self.state.write();
        Self::check_fault(&state, EngineOp::Scroll, "")?;
        let now = Instant::now();
        state.cursors.retain(|_, c| c.expires_at > now);
        let cursor = state
            .cursors
            .get_mut(cursor_id)
            .ok_or_else(|| EngineError::CursorNotFound {
                cursor_id: cursor_id.to_string(),
            })?;
        Ok(Self::next_page(cursor_id, cursor, keep_alive))
    }

    fn clear_scroll(&self, cursor_id: &str) -> EngineResult<()> {
        let mut state = self.state.write();
        state
            .cursors
            .remove(cursor_id)
            .map(|_| ())
            .ok_or_else(|| EngineError::CursorNotFound {
                cursor_id: cursor_id.to_string(),
            })
    }

    fn bulk(&self, operations: &[BulkOperation]) -> EngineResult<BulkResponse> {
        {
            let state = self.state.read();
            for operation in operations {
                Self::check_fault(&state, EngineOp::Bulk, operation.index())?;
            }
        }
        let items = operations
            .iter()
            .map(|operation| BulkItem {
                index: operation.index().to_string(),
                id: operation.id().to_string(),
                error: self.apply_bulk(operation).err(),
            })
            .collect();
        Ok(BulkResponse { items })
    }
}

impl std::fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryEngine")
            .field("indices", &state.indices.keys().collect::<Vec<_>>())
            .field("cursors", &state.cursors.len())
            .finish()
    }
}
