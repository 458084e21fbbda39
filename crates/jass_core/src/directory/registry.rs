//! The tenant's directory registry.

use super::{DirectoryNames, DirectoryRecord, DocumentDirectory};
use crate::codec::{from_document, to_document};
use crate::config::Settings;
use crate::connection::ConnectionProvider;
use crate::cursor::ScrollCursor;
use crate::error::{CoreError, CoreResult};
use crate::naming;
use jass_engine::{
    EngineError, EngineMapping, FieldMapping, FieldType, IndexBody, IndexOption, IndexSettings,
    Query, SearchEngine, SearchRequest,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Lists every directory of a tenant and creates or deletes them.
pub struct DirectoryRegistry {
    conn: Arc<ConnectionProvider>,
    settings: Arc<Settings>,
    index: String,
}

impl DirectoryRegistry {
    /// Creates a handle on the registry of `settings.tenant_id`.
    pub fn new(conn: Arc<ConnectionProvider>, settings: &Settings) -> Self {
        let dir = &settings.directory;
        let index = format!(
            "{}{}{}",
            settings.tenant_id, dir.class_prefix, dir.registry_suffix
        );
        Self {
            conn,
            settings: Arc::new(settings.clone()),
            index,
        }
    }

    /// Physical name of the registry index.
    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    fn engine(&self) -> CoreResult<Arc<dyn SearchEngine>> {
        self.conn.engine()
    }

    fn tenant_id(&self) -> &str {
        &self.settings.tenant_id
    }

    fn class_prefix(&self) -> &str {
        &self.settings.directory.class_prefix
    }

    fn index_settings(&self) -> IndexSettings {
        IndexSettings::new(
            self.settings.index.number_of_shards,
            self.settings.index.number_of_replicas,
        )
    }

    fn record_mapping() -> EngineMapping {
        let exact = FieldMapping::of(FieldType::String).with_index(IndexOption::NotAnalyzed);
        EngineMapping::new()
            .with_field("id", exact.clone())
            .with_field("alias", exact)
    }

    fn create_index(&self, name: &str, body: &IndexBody) -> CoreResult<bool> {
        if !naming::valid_for_create(name, self.tenant_id(), self.class_prefix()) {
            return Err(CoreError::invalid_name(name));
        }
        self.conn.wait_ready()?;
        match self.engine()?.create_index(name, body) {
            Ok(()) => Ok(true),
            Err(EngineError::IndexAlreadyExists { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Provisions the registry index. An existing index is kept.
    ///
    /// # Errors
    ///
    /// `InvalidName` if the tenant id produces an unsafe index name.
    pub fn create(&self) -> CoreResult<()> {
        let body = IndexBody::new(self.index_settings()).with_mappings(Self::record_mapping());
        if self.create_index(&self.index, &body)? {
            info!(index = %self.index, "directory registry created");
        } else {
            debug!(index = %self.index, "directory registry already exists");
        }
        Ok(())
    }

    /// Returns true if the registry index exists.
    ///
    /// # Errors
    ///
    /// Engine errors.
    pub fn exists(&self) -> CoreResult<bool> {
        Ok(self.engine()?.index_exists(&self.index)?)
    }

    fn directory(&self, record: DirectoryRecord) -> DocumentDirectory {
        DocumentDirectory::new(self.conn.clone(), self.settings.clone(), record)
    }

    fn alias_taken(&self, alias: &str) -> CoreResult<bool> {
        let request = SearchRequest::new(Query::term("alias", alias), 1);
        Ok(self.engine()?.search(&self.index, &request)?.total > 0)
    }

    /// Registers a directory and provisions its type index, plus the
    /// default type's data index when `include_default_type` is set.
    ///
    /// The steps are not transactional. Calling again after a partial
    /// failure fails with `AlreadyExists`; the remaining steps can be
    /// completed through the returned directory's schema operations.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `id` is empty or not in id form
    /// - `AlreadyExists` if the id is taken or names the registry itself
    /// - `AliasAlreadyExists` if a non-blank alias is taken
    pub fn create_directory(
        &self,
        id: &str,
        alias: Option<&str>,
        include_default_type: bool,
    ) -> CoreResult<DocumentDirectory> {
        if id.is_empty() || naming::string_to_id(id) != id {
            return Err(CoreError::invalid_name(id));
        }
        if id == self.settings.directory.registry_suffix || id == self.index {
            return Err(CoreError::already_exists("directory", id));
        }
        self.conn.wait_ready()?;

        let engine = self.engine()?;
        if engine.get_document(&self.index, id)?.is_some() {
            return Err(CoreError::already_exists("directory", id));
        }
        let alias = alias.filter(|a| !a.trim().is_empty());
        if let Some(alias) = alias {
            if self.alias_taken(alias)? {
                warn!(directory = id, alias, "alias already in use");
                return Err(CoreError::AliasAlreadyExists {
                    alias: alias.to_string(),
                });
            }
        }

        let record = DirectoryRecord {
            id: id.to_string(),
            alias: alias.map(str::to_string),
        };
        match engine.create_document(&self.index, id, &to_document(&record)?) {
            Ok(()) => {}
            Err(EngineError::VersionConflict { .. }) => {
                return Err(CoreError::already_exists("directory", id));
            }
            Err(err) => return Err(err.into()),
        }

        let names = DirectoryNames::new(&self.settings, id);
        self.create_index(&names.type_index, &IndexBody::new(self.index_settings()))?;
        let directory = self.directory(record);
        if include_default_type {
            let default_type = &self.settings.directory.default_type;
            directory.add_or_update_schema(&EngineMapping::new(), default_type, true)?;
        }
        info!(directory = id, alias = ?alias, "directory created");
        Ok(directory)
    }

    /// Opens a registered directory.
    ///
    /// # Errors
    ///
    /// `NotFound` if no directory has that id.
    pub fn get_directory(&self, id: &str) -> CoreResult<DocumentDirectory> {
        let doc = self
            .engine()?
            .get_document(&self.index, id)?
            .ok_or_else(|| CoreError::not_found("directory", id))?;
        let record: DirectoryRecord = from_document(id, doc)?;
        Ok(self.directory(record))
    }

    /// Streams every directory of the tenant.
    ///
    /// Records are fetched page by page while the iterator is driven.
    ///
    /// # Errors
    ///
    /// Engine errors from opening the traversal; later page errors are
    /// yielded by the iterator.
    pub fn list_directories(
        &self,
    ) -> CoreResult<impl Iterator<Item = CoreResult<DocumentDirectory>>> {
        let request = SearchRequest::new(Query::MatchAll, self.settings.scroll.page_size);
        let cursor = ScrollCursor::open(
            self.engine()?,
            &self.index,
            &request,
            self.settings.scroll.keep_alive,
        )?;
        let conn = self.conn.clone();
        let settings = self.settings.clone();
        Ok(cursor.map(move |hit| {
            let hit = hit?;
            let record: DirectoryRecord = from_document(&hit.id, hit.source)?;
            Ok(DocumentDirectory::new(conn.clone(), settings.clone(), record))
        }))
    }

    /// Deletes a directory with every index it owns.
    ///
    /// Every step runs even when an earlier one fails; parts that are
    /// already gone count as deleted.
    ///
    /// # Errors
    ///
    /// `DeleteFailed` listing each failed step.
    pub fn delete_directory(&self, directory: &DocumentDirectory) -> CoreResult<()> {
        let names = directory.names();
        let mut failures = Vec::new();
        let mut indices = match directory.data_indices() {
            Ok(indices) => indices,
            Err(err) => {
                failures.push(format!("type bindings: {err}"));
                Vec::new()
            }
        };
        if !indices.contains(&names.default_data_index) {
            indices.push(names.default_data_index.clone());
        }
        indices.push(names.type_index.clone());

        match self.engine() {
            Ok(engine) => match engine.delete_document(&self.index, directory.id()) {
                Ok(()) | Err(EngineError::DocumentNotFound { .. }) => {}
                Err(err) => failures.push(format!("registry record: {err}")),
            },
            Err(err) => failures.push(format!("registry record: {err}")),
        }
        for index in &indices {
            if let Err(err) = self.delete_indices(index) {
                failures.push(format!("{index}: {err}"));
            }
        }

        if failures.is_empty() {
            info!(directory = %directory.id(), "directory deleted");
            Ok(())
        } else {
            for failure in &failures {
                error!(directory = %directory.id(), failure = %failure, "directory delete step failed");
            }
            Err(CoreError::DeleteFailed { failures })
        }
    }

    fn delete_indices(&self, selector: &str) -> CoreResult<()> {
        if !naming::valid_for_delete(selector, self.tenant_id(), self.class_prefix()) {
            return Err(CoreError::invalid_name(selector));
        }
        match self.engine()?.delete_index(selector) {
            Ok(_) | Err(EngineError::IndexNotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes every directory and then the registry index itself.
    ///
    /// # Errors
    ///
    /// `DeleteFailed` listing every failure across all directories.
    pub fn delete(&self) -> CoreResult<()> {
        if !self.exists()? {
            return Ok(());
        }
        let mut failures = Vec::new();
        let mut directories = Vec::new();
        for directory in self.list_directories()? {
            match directory {
                Ok(directory) => directories.push(directory),
                Err(err) => failures.push(format!("listing: {err}")),
            }
        }
        for directory in &directories {
            match self.delete_directory(directory) {
                Ok(()) => {}
                Err(CoreError::DeleteFailed { failures: steps }) => failures.extend(steps),
                Err(err) => failures.push(err.to_string()),
            }
        }
        if let Err(err) = self.delete_indices(&self.index) {
            failures.push(format!("{}: {err}", self.index));
        }

        if failures.is_empty() {
            info!(index = %self.index, count = directories.len(), "directory registry deleted");
            Ok(())
        } else {
            Err(CoreError::DeleteFailed { failures })
        }
    }
}

impl std::fmt::Debug for DirectoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryRegistry")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{SearchParams, WriteOptions};
    use jass_engine::{EngineOp, InMemoryEngine};
    use serde_json::json;

    fn registry() -> (DirectoryRegistry, Arc<InMemoryEngine>) {
        let engine = Arc::new(InMemoryEngine::new());
        let conn = Arc::new(ConnectionProvider::for_engine(engine.clone()));
        let registry = DirectoryRegistry::new(conn, &Settings::default().tenant_id("unit"));
        registry.create().unwrap();
        (registry, engine)
    }

    #[test]
    fn create_is_idempotent() {
        let (registry, _) = registry();
        assert_eq!(registry.index(), "unit_dd_document_directory_listing");
        registry.create().unwrap();
        assert!(registry.exists().unwrap());
    }

    #[test]
    fn create_and_get() {
        let (registry, engine) = registry();
        registry.create_directory("docs", Some("Docs"), true).unwrap();
        let dir = registry.get_directory("docs").unwrap();
        assert_eq!(dir.alias(), Some("Docs"));
        assert!(engine.index_exists("unit_dd_docs_type").unwrap());
        assert!(engine.index_exists("unit_dd_docs_data_0").unwrap());
        assert!(registry.get_directory("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn without_default_type_only_the_type_index_exists() {
        let (registry, engine) = registry();
        let dir = registry.create_directory("bare", None, false).unwrap();
        assert!(engine.index_exists("unit_dd_bare_type").unwrap());
        assert!(!engine.index_exists("unit_dd_bare_data_0").unwrap());
        assert_eq!(dir.binding("default").unwrap(), None);
    }

    #[test]
    fn duplicates_are_rejected() {
        let (registry, _) = registry();
        registry.create_directory("docs", Some("shared"), true).unwrap();
        assert!(matches!(
            registry.create_directory("docs", None, true),
            Err(CoreError::AlreadyExists { .. })
        ));
        assert!(matches!(
            registry.create_directory("other", Some("shared"), true),
            Err(CoreError::AliasAlreadyExists { .. })
        ));
        registry.create_directory("third", Some("  "), true).unwrap();
        assert!(matches!(
            registry.create_directory("document_directory_listing", None, true),
            Err(CoreError::AlreadyExists { .. })
        ));
        let own_index = registry.index().to_string();
        assert!(matches!(
            registry.create_directory(&own_index, None, true),
            Err(CoreError::AlreadyExists { .. })
        ));
        assert!(registry.get_directory(&own_index).unwrap_err().is_not_found());
    }

    #[test]
    fn ids_must_be_in_id_form() {
        let (registry, engine) = registry();
        for id in ["", "Docs", "a b", "a*"] {
            assert!(matches!(
                registry.create_directory(id, None, true),
                Err(CoreError::InvalidName { .. })
            ));
        }
        assert_eq!(engine.index_names(), vec!["unit_dd_document_directory_listing"]);
    }

    #[test]
    fn list_streams_every_record() {
        let (registry, _) = registry();
        for id in ["a", "b", "c"] {
            registry.create_directory(id, None, false).unwrap();
        }
        let mut ids: Vec<String> = registry
            .list_directories()
            .unwrap()
            .map(|dir| dir.unwrap().id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn delete_directory_removes_every_index() {
        let (registry, engine) = registry();
        let dir = registry.create_directory("docs", None, true).unwrap();
        dir.add_or_update_schema(&EngineMapping::new(), "other", true)
            .unwrap();
        registry.create_directory("keep", None, true).unwrap();

        registry.delete_directory(&dir).unwrap();
        assert!(registry.get_directory("docs").unwrap_err().is_not_found());
        assert!(engine
            .index_names()
            .iter()
            .all(|name| !name.starts_with("unit_dd_docs_")));
        assert!(engine.index_exists("unit_dd_keep_data_0").unwrap());

        registry.delete_directory(&dir).unwrap();
    }

    #[test]
    fn deleting_a_directory_spares_prefixed_siblings() {
        let (registry, engine) = registry();
        let docs = registry.create_directory("docs", None, true).unwrap();
        let sibling = registry.create_directory("docs_data", None, true).unwrap();
        let record = json!({"name": "kept"}).as_object().cloned().unwrap();
        let id = sibling.add_document(&record, WriteOptions::new()).unwrap();

        assert!(!docs.document_exists(&id, None).unwrap());
        let everything = SearchParams::new().with_doc_types(Vec::<String>::new());
        assert!(docs.small_search(&everything).unwrap().is_empty());
        assert_eq!(sibling.small_search(&everything).unwrap().len(), 1);

        registry.delete_directory(&docs).unwrap();
        assert!(!engine.index_exists("unit_dd_docs_type").unwrap());
        assert!(!engine.index_exists("unit_dd_docs_data_0").unwrap());
        assert!(engine.index_exists("unit_dd_docs_data_type").unwrap());
        assert!(engine.index_exists("unit_dd_docs_data_data_0").unwrap());
        assert_eq!(sibling.get_document(&id, "default").unwrap()["name"], "kept");
        assert!(sibling.document_exists(&id, None).unwrap());
    }

    #[test]
    fn unbound_directory_reads_nothing() {
        let (registry, _) = registry();
        let bare = registry.create_directory("bare", None, false).unwrap();
        assert_eq!(bare.resolve_indices(&[]).unwrap(), None);
        assert!(!bare.document_exists("x", None).unwrap());
    }

    #[test]
    fn delete_directory_aggregates_failures() {
        let (registry, engine) = registry();
        let dir = registry.create_directory("docs", None, true).unwrap();
        engine.inject_fault(EngineOp::DeleteIndex, "*");
        let Err(CoreError::DeleteFailed { failures }) = registry.delete_directory(&dir) else {
            panic!("expected DeleteFailed");
        };
        assert_eq!(failures.len(), 2);
        assert!(registry.get_directory("docs").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_cascades() {
        let (registry, engine) = registry();
        registry.create_directory("a", None, true).unwrap();
        registry.create_directory("b", None, true).unwrap();
        registry.delete().unwrap();
        assert!(engine.index_names().is_empty());
        registry.delete().unwrap();
    }
}
