//! Cursor-driven traversal of large result sets.

use crate::error::{CoreError, CoreResult};
use jass_engine::{EngineError, Hit, SearchEngine, SearchRequest};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Streams every hit of a query, one engine page at a time.
///
/// The server-side cursor is released once the traversal is exhausted,
/// when [`ScrollCursor::close`] is called, or when the value is dropped.
pub struct ScrollCursor {
    engine: Arc<dyn SearchEngine>,
    keep_alive: Duration,
    cursor_id: Option<String>,
    buffer: VecDeque<Hit>,
    total: usize,
}

impl ScrollCursor {
    /// Opens a cursor over `selector`. `request.size` is the page size.
    ///
    /// # Errors
    ///
    /// Engine errors from opening the cursor.
    pub fn open(
        engine: Arc<dyn SearchEngine>,
        selector: &str,
        request: &SearchRequest,
        keep_alive: Duration,
    ) -> CoreResult<Self> {
        let page = engine.open_scroll(selector, request, keep_alive)?;
        debug!(selector, total = page.total, "cursor opened");
        let mut cursor = Self {
            engine,
            keep_alive,
            cursor_id: Some(page.cursor_id),
            buffer: page.hits.into(),
            total: page.total,
        };
        if cursor.buffer.is_empty() {
            cursor.release();
        }
        Ok(cursor)
    }

    /// Total number of matches.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns true while a server-side cursor is held.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.cursor_id.is_some()
    }

    /// Releases the server-side cursor early.
    ///
    /// # Errors
    ///
    /// Engine errors other than an already expired cursor.
    pub fn close(mut self) -> CoreResult<()> {
        match self.cursor_id.take() {
            Some(id) => clear(self.engine.as_ref(), &id),
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        if let Some(id) = self.cursor_id.take() {
            if let Err(err) = clear(self.engine.as_ref(), &id) {
                warn!(cursor = %id, error = %err, "failed to release cursor");
            }
        }
    }

    fn fetch(&mut self) -> CoreResult<()> {
        let Some(id) = self.cursor_id.clone() else {
            return Ok(());
        };
        let page = self.engine.scroll(&id, self.keep_alive)?;
        self.cursor_id = Some(page.cursor_id);
        if page.hits.is_empty() {
            self.release();
        } else {
            self.buffer.extend(page.hits);
        }
        Ok(())
    }
}

fn clear(engine: &dyn SearchEngine, id: &str) -> CoreResult<()> {
    match engine.clear_scroll(id) {
        Ok(()) | Err(EngineError::CursorNotFound { .. }) => Ok(()),
        Err(err) => Err(CoreError::Engine(err)),
    }
}

impl Iterator for ScrollCursor {
    type Item = CoreResult<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && self.cursor_id.is_some() {
            if let Err(err) = self.fetch() {
                self.cursor_id = None;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl Drop for ScrollCursor {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ScrollCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollCursor")
            .field("total", &self.total)
            .field("buffered", &self.buffer.len())
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jass_engine::{EngineOp, IndexBody, InMemoryEngine, Query};
    use serde_json::json;

    fn engine_with(count: usize) -> Arc<InMemoryEngine> {
        let engine = Arc::new(InMemoryEngine::new());
        engine.create_index("docs", &IndexBody::default()).unwrap();
        for i in 0..count {
            let doc = json!({"n": i}).as_object().cloned().unwrap();
            engine.create_document("docs", &format!("d{i:02}"), &doc).unwrap();
        }
        engine
    }

    fn open(engine: &Arc<InMemoryEngine>, page: usize) -> ScrollCursor {
        ScrollCursor::open(
            engine.clone(),
            "docs",
            &SearchRequest::new(Query::MatchAll, page),
            Duration::from_secs(60),
        )
        .unwrap()
    }

    #[test]
    fn drains_every_page_then_releases() {
        let engine = engine_with(7);
        let cursor = open(&engine, 3);
        assert_eq!(cursor.total(), 7);
        let ids: Vec<String> = cursor.map(|hit| hit.unwrap().id).collect();
        assert_eq!(ids.len(), 7);
        assert_eq!(ids[0], "d00");
        assert_eq!(engine.open_cursors(), 0);
    }

    #[test]
    fn empty_result_holds_no_cursor() {
        let engine = engine_with(0);
        let mut cursor = open(&engine, 3);
        assert!(!cursor.is_live());
        assert_eq!(engine.open_cursors(), 0);
        assert!(cursor.next().is_none());
    }

    #[test]
    fn dropping_early_releases() {
        let engine = engine_with(5);
        let mut cursor = open(&engine, 2);
        cursor.next().unwrap().unwrap();
        assert_eq!(engine.open_cursors(), 1);
        drop(cursor);
        assert_eq!(engine.open_cursors(), 0);
    }

    #[test]
    fn close_tolerates_expiry() {
        let engine = engine_with(5);
        let cursor = open(&engine, 2);
        engine.expire_cursors();
        cursor.close().unwrap();
    }

    #[test]
    fn page_errors_end_the_traversal() {
        let engine = engine_with(5);
        let mut cursor = open(&engine, 2);
        engine.inject_fault(EngineOp::Scroll, "*");
        assert!(cursor.next().unwrap().is_ok());
        assert!(cursor.next().unwrap().is_ok());
        assert!(cursor.next().unwrap().is_err());
        assert!(cursor.next().is_none());
    }
}
