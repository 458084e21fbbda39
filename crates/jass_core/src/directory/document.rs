//! Typed documents inside one directory.

use super::{DirectoryNames, DirectoryRecord};
use crate::codec::{from_document, to_document};
use crate::config::Settings;
use crate::connection::ConnectionProvider;
use crate::cursor::ScrollCursor;
use crate::error::{CoreError, CoreResult};
use crate::migration::compute_delta;
use crate::naming;
use crate::query::{with_filter, SearchClauses};
use crate::schema::search_mode_analysis;
use jass_engine::{
    BulkOperation, Document, EngineError, EngineMapping, Hit, IndexBody, IndexSettings, Query,
    SearchEngine, SearchRequest, SourceFilter, DEFAULT_MAX_RESULT_WINDOW,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Binding {
    index_name: String,
}

/// Options of a single document write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Document id; generated when absent.
    pub id: Option<String>,
    /// Document type.
    pub doc_type: String,
    /// Mapping fragment to migrate the type's index to before writing.
    pub schema: Option<EngineMapping>,
    /// Merge into an existing document instead of inserting.
    pub update: bool,
    /// Bind the type to a new index when it is unbound.
    pub create_index_if_missing: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            id: None,
            doc_type: "default".to_string(),
            schema: None,
            update: false,
            create_index_if_missing: true,
        }
    }
}

impl WriteOptions {
    /// Default options: insert into the `default` type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the document type.
    #[must_use]
    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = doc_type.into();
        self
    }

    /// Sets the mapping fragment.
    #[must_use]
    pub fn with_schema(mut self, schema: EngineMapping) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Switches to partial update.
    #[must_use]
    pub fn updating(mut self) -> Self {
        self.update = true;
        self
    }

    /// Fails with `NoSchemaFound` instead of binding an unbound type.
    #[must_use]
    pub fn require_existing_index(mut self) -> Self {
        self.create_index_if_missing = false;
        self
    }
}

/// Parameters of [`DocumentDirectory::small_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Types to search; empty searches every type.
    pub doc_types: Vec<String>,
    /// Field clauses.
    pub clauses: SearchClauses,
    /// Extra unscored filter, such as a span filter.
    pub filter: Option<Query>,
    /// Fields to return; `id` and `type` are always added.
    pub return_fields: Option<Vec<String>>,
    /// Traverse with a cursor instead of one bounded page.
    pub use_scan: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            doc_types: vec!["default".to_string()],
            clauses: SearchClauses::default(),
            filter: None,
            return_fields: None,
            use_scan: true,
        }
    }
}

impl SearchParams {
    /// Searches the `default` type with a cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the types.
    #[must_use]
    pub fn with_doc_types<I, S>(mut self, doc_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc_types = doc_types.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the clauses.
    #[must_use]
    pub fn with_clauses(mut self, clauses: SearchClauses) -> Self {
        self.clauses = clauses;
        self
    }

    /// Sets the extra filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Query) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Restricts the returned fields.
    #[must_use]
    pub fn with_return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Returns a single bounded page instead of traversing.
    #[must_use]
    pub fn bounded(mut self) -> Self {
        self.use_scan = false;
        self
    }
}

/// Outcome of one document of a bulk insert.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    /// Id the document was written under.
    pub id: String,
    /// Why it was not written.
    pub error: Option<CoreError>,
}

/// One directory of typed documents.
pub struct DocumentDirectory {
    conn: Arc<ConnectionProvider>,
    settings: Arc<Settings>,
    record: DirectoryRecord,
    names: DirectoryNames,
}

impl DocumentDirectory {
    pub(crate) fn new(
        conn: Arc<ConnectionProvider>,
        settings: Arc<Settings>,
        record: DirectoryRecord,
    ) -> Self {
        let names = DirectoryNames::new(&settings, &record.id);
        Self {
            conn,
            settings,
            record,
            names,
        }
    }

    /// Directory id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Directory alias.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.record.alias.as_deref()
    }

    /// The registry record.
    #[must_use]
    pub fn record(&self) -> &DirectoryRecord {
        &self.record
    }

    /// Physical index names.
    #[must_use]
    pub fn names(&self) -> &DirectoryNames {
        &self.names
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

    /// Physical index bound to `doc_type`, if any.
    ///
    /// # Errors
    ///
    /// Engine errors, including a missing type index.
    pub fn binding(&self, doc_type: &str) -> CoreResult<Option<String>> {
        match self.engine()?.get_document(&self.names.type_index, doc_type)? {
            Some(doc) => Ok(Some(from_document::<Binding>(doc_type, doc)?.index_name)),
            None => Ok(None),
        }
    }

    /// Every binding of the directory, by type.
    ///
    /// # Errors
    ///
    /// Engine errors.
    pub fn indices_per_doc_type(&self) -> CoreResult<BTreeMap<String, String>> {
        let request = SearchRequest::new(Query::MatchAll, self.settings.scroll.page_size);
        let cursor = ScrollCursor::open(
            self.engine()?,
            &self.names.type_index,
            &request,
            self.settings.scroll.keep_alive,
        )?;
        let mut bindings = BTreeMap::new();
        for hit in cursor {
            let Hit { id, source, .. } = hit?;
            let binding: Binding = from_document(&id, source)?;
            bindings.insert(id, binding.index_name);
        }
        Ok(bindings)
    }

    /// Distinct data indices bound to any type of the directory.
    ///
    /// A directory whose type index is gone has none.
    ///
    /// # Errors
    ///
    /// Engine errors other than not-found.
    pub fn data_indices(&self) -> CoreResult<Vec<String>> {
        let bindings = match self.indices_per_doc_type() {
            Ok(bindings) => bindings,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut indices: Vec<String> = bindings.into_values().collect();
        indices.sort();
        indices.dedup();
        Ok(indices)
    }

    /// Index selector covering `doc_types`.
    ///
    /// No types selects every bound data index of the directory. Unbound
    /// types are skipped; `None` means nothing matched.
    ///
    /// # Errors
    ///
    /// Engine errors.
    pub fn resolve_indices(&self, doc_types: &[String]) -> CoreResult<Option<String>> {
        if doc_types.is_empty() {
            let indices = self.data_indices()?;
            return Ok((!indices.is_empty()).then(|| indices.join(",")));
        }
        let mut indices = Vec::new();
        for doc_type in doc_types {
            if let Some(index) = self.binding(doc_type)? {
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
        }
        Ok((!indices.is_empty()).then(|| indices.join(",")))
    }

    /// Returns true if the document exists.
    ///
    /// With a type only its bound index is checked; without one every bound
    /// data index of the directory is searched.
    ///
    /// # Errors
    ///
    /// Engine errors other than not-found.
    pub fn document_exists(&self, id: &str, doc_type: Option<&str>) -> CoreResult<bool> {
        let engine = self.engine()?;
        match doc_type {
            Some(doc_type) => {
                let Some(index) = self.binding(doc_type)? else {
                    return Ok(false);
                };
                match engine.get_document(&index, id) {
                    Ok(doc) => Ok(doc.is_some()),
                    Err(EngineError::IndexNotFound { .. }) => Ok(false),
                    Err(err) => Err(err.into()),
                }
            }
            None => {
                let Some(selector) = self.resolve_indices(&[])? else {
                    return Ok(false);
                };
                let request = SearchRequest::new(Query::ids([id]), 1);
                Ok(engine.search(&selector, &request)?.total > 0)
            }
        }
    }

    fn data_index_body(&self, allow_dynamic_fields: bool) -> IndexBody {
        let defaults = &self.settings.index;
        let settings = IndexSettings::new(defaults.number_of_shards, defaults.number_of_replicas)
            .with_max_result_window(defaults.data_max_result_window)
            .with_analysis(search_mode_analysis());
        let body = IndexBody::new(settings);
        if allow_dynamic_fields {
            body
        } else {
            body.with_mappings(EngineMapping::strict())
        }
    }

    fn provision_index(&self, index: &str, allow_dynamic_fields: bool) -> CoreResult<()> {
        if !naming::valid_for_create(index, self.tenant_id(), self.class_prefix()) {
            return Err(CoreError::invalid_name(index));
        }
        self.conn.wait_ready()?;
        match self
            .engine()?
            .create_index(index, &self.data_index_body(allow_dynamic_fields))
        {
            Ok(()) => {
                debug!(directory = %self.record.id, index, allow_dynamic_fields, "data index provisioned");
                Ok(())
            }
            Err(EngineError::IndexAlreadyExists { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the index bound to `doc_type`, binding and creating one first
    /// if needed.
    ///
    /// The binding is claimed with an atomic create; a caller losing the
    /// race adopts the winner's index.
    fn ensure_binding(&self, doc_type: &str, allow_dynamic_fields: bool) -> CoreResult<String> {
        let engine = self.engine()?;
        if let Some(index) = self.binding(doc_type)? {
            if !engine.index_exists(&index)? {
                self.provision_index(&index, allow_dynamic_fields)?;
            }
            return Ok(index);
        }

        let candidate = if doc_type == self.settings.directory.default_type {
            self.names.default_data_index.clone()
        } else {
            self.names.new_data_index()
        };
        let binding = to_document(&Binding {
            index_name: candidate.clone(),
        })?;
        let index = match engine.create_document(&self.names.type_index, doc_type, &binding) {
            Ok(()) => candidate,
            Err(EngineError::VersionConflict { .. }) => {
                debug!(directory = %self.record.id, doc_type, "binding created concurrently");
                self.binding(doc_type)?
                    .ok_or_else(|| CoreError::not_found("binding", doc_type))?
            }
            Err(err) => return Err(err.into()),
        };
        self.provision_index(&index, allow_dynamic_fields)?;
        Ok(index)
    }

    /// Merges a mapping fragment into the index of `doc_type`, binding the
    /// type first if needed. A new index rejects undeclared fields unless
    /// `allow_dynamic_fields` is set.
    ///
    /// # Errors
    ///
    /// `MigrationIncompatible` if the fragment redefines a live field.
    pub fn add_or_update_schema(
        &self,
        fragment: &EngineMapping,
        doc_type: &str,
        allow_dynamic_fields: bool,
    ) -> CoreResult<String> {
        let index = self.ensure_binding(doc_type, allow_dynamic_fields)?;
        self.conn.wait_ready()?;
        match self.engine()?.put_mapping(&index, fragment) {
            Ok(()) => Ok(index),
            Err(EngineError::MappingConflict { field, .. }) => {
                Err(CoreError::MigrationIncompatible { field })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Live mapping of the index bound to `doc_type`.
    ///
    /// # Errors
    ///
    /// Engine errors.
    pub fn live_mapping(&self, doc_type: &str) -> CoreResult<Option<EngineMapping>> {
        match self.binding(doc_type)? {
            Some(index) => Ok(Some(self.engine()?.get_mapping(&index)?)),
            None => Ok(None),
        }
    }

    fn target_index(&self, doc_type: &str, create_if_missing: bool) -> CoreResult<String> {
        if create_if_missing {
            return self.ensure_binding(doc_type, true);
        }
        self.binding(doc_type)?
            .ok_or_else(|| CoreError::NoSchemaFound {
                doc_type: doc_type.to_string(),
            })
    }

    fn migrate(&self, index: &str, doc_type: &str, schema: &EngineMapping) -> CoreResult<()> {
        let live = self.engine()?.get_mapping(index)?;
        let fragment = if live.is_empty() {
            schema.clone()
        } else {
            compute_delta(&live, schema)?
        };
        if !fragment.is_empty() {
            self.add_or_update_schema(&fragment, doc_type, true)?;
        }
        Ok(())
    }

    /// Writes a document and returns its id.
    ///
    /// A schema fragment in `options` is checked against the live mapping
    /// and only its new fields are merged.
    ///
    /// # Errors
    ///
    /// - `NoSchemaFound` for an unbound type when creation is disabled
    /// - `AlreadyExists` when inserting an existing id
    /// - `NotFound` when updating a missing document
    /// - `SchemaViolation` when the document does not fit a strict mapping
    /// - migration errors from the schema fragment
    pub fn add_or_update_document(&self, doc: &Document, options: WriteOptions) -> CoreResult<String> {
        let index = self.target_index(&options.doc_type, options.create_index_if_missing)?;
        if let Some(schema) = &options.schema {
            self.migrate(&index, &options.doc_type, schema)?;
        }

        let id = options
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let engine = self.engine()?;
        let written = if options.update {
            engine.update_document(&index, &id, doc)
        } else {
            engine.create_document(&index, &id, doc)
        };
        match written {
            Ok(()) => Ok(id),
            Err(err @ EngineError::VersionConflict { .. }) => {
                warn!(directory = %self.record.id, doc_type = %options.doc_type, id = %id, "document already exists");
                Err(CoreError::from_write(err))
            }
            Err(err) => Err(CoreError::from_write(err)),
        }
    }

    /// Inserts a document. Shorthand for [`Self::add_or_update_document`].
    ///
    /// # Errors
    ///
    /// See [`Self::add_or_update_document`].
    pub fn add_document(&self, doc: &Document, options: WriteOptions) -> CoreResult<String> {
        let options = WriteOptions {
            update: false,
            ..options
        };
        self.add_or_update_document(doc, options)
    }

    /// Merges `doc` into an existing document of a bound type.
    ///
    /// # Errors
    ///
    /// `NoSchemaFound` for an unbound type, `NotFound` for a missing document.
    pub fn update_document(&self, doc: &Document, id: &str, doc_type: &str) -> CoreResult<String> {
        let options = WriteOptions::new()
            .with_id(id)
            .with_doc_type(doc_type)
            .updating()
            .require_existing_index();
        self.add_or_update_document(doc, options)
    }

    /// Inserts many documents of one type in a single bulk request.
    ///
    /// Returns one outcome per document, in order.
    ///
    /// # Errors
    ///
    /// Binding errors, or a failure of the bulk request as a whole.
    pub fn add_documents(
        &self,
        docs: Vec<(Option<String>, Document)>,
        doc_type: &str,
    ) -> CoreResult<Vec<BulkOutcome>> {
        let index = self.ensure_binding(doc_type, true)?;
        let operations: Vec<BulkOperation> = docs
            .into_iter()
            .map(|(id, source)| BulkOperation::Create {
                index: index.clone(),
                id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                source,
            })
            .collect();
        let response = self.engine()?.bulk(&operations)?;
        if response.has_errors() {
            warn!(directory = %self.record.id, doc_type, "bulk insert had failures");
        }
        Ok(response
            .items
            .into_iter()
            .map(|item| BulkOutcome {
                id: item.id,
                error: item.error.map(CoreError::from_write),
            })
            .collect())
    }

    /// Fetches a document, with its id under `id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the type is unbound or the document is missing.
    pub fn get_document(&self, id: &str, doc_type: &str) -> CoreResult<Document> {
        let index = self
            .binding(doc_type)?
            .ok_or_else(|| CoreError::not_found("document type", doc_type))?;
        let mut doc = self
            .engine()?
            .get_document(&index, id)
            .map_err(CoreError::from_write)?
            .ok_or_else(|| CoreError::not_found("document", id))?;
        doc.insert("id".to_string(), Value::String(id.to_string()));
        Ok(doc)
    }

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// `NotFound` if the type is unbound or the document is missing.
    pub fn delete_document(&self, id: &str, doc_type: &str) -> CoreResult<()> {
        let index = self
            .binding(doc_type)?
            .ok_or_else(|| CoreError::not_found("document type", doc_type))?;
        self.engine()?
            .delete_document(&index, id)
            .map_err(CoreError::from_write)
    }

    fn bound_index(&self, doc_type: &str) -> CoreResult<String> {
        self.binding(doc_type)?
            .ok_or_else(|| CoreError::NoSchemaFound {
                doc_type: doc_type.to_string(),
            })
    }

    fn drop_index(&self, index: &str) -> CoreResult<()> {
        if !naming::valid_for_delete(index, self.tenant_id(), self.class_prefix()) {
            return Err(CoreError::invalid_name(index));
        }
        match self.engine()?.delete_index(index) {
            Ok(_) | Err(EngineError::IndexNotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes the index of `doc_type` and its binding.
    ///
    /// # Errors
    ///
    /// `NoSchemaFound` if the type is unbound.
    pub fn delete_doc_type(&self, doc_type: &str) -> CoreResult<()> {
        let index = self.bound_index(doc_type)?;
        self.conn.wait_ready()?;
        self.drop_index(&index)?;
        match self.engine()?.delete_document(&self.names.type_index, doc_type) {
            Ok(()) | Err(EngineError::DocumentNotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }
        info!(directory = %self.record.id, doc_type, index = %index, "document type deleted");
        Ok(())
    }

    /// Removes every document of `doc_type` while keeping its settings and
    /// mapping. The type stays bound to the same index name.
    ///
    /// # Errors
    ///
    /// `NoSchemaFound` if the type is unbound.
    pub fn empty_doc_type(&self, doc_type: &str) -> CoreResult<()> {
        let index = self.bound_index(doc_type)?;
        self.conn.wait_ready()?;
        let engine = self.engine()?;
        let settings = engine.get_settings(&index)?.without_creation_only();
        let mapping = engine.get_mapping(&index)?;

        self.delete_doc_type(doc_type)?;
        self.conn.wait_ready()?;
        engine.create_index(&index, &IndexBody::new(settings).with_mappings(mapping))?;
        let binding = to_document(&Binding {
            index_name: index.clone(),
        })?;
        engine.index_document(&self.names.type_index, doc_type, &binding)?;
        info!(directory = %self.record.id, doc_type, index = %index, "document type emptied");
        Ok(())
    }

    /// Runs a search and returns every hit as its source plus `id` and
    /// `type`.
    ///
    /// With `use_scan` the whole result set is traversed with a cursor;
    /// otherwise a single page of at most 10 000 hits is returned.
    ///
    /// # Errors
    ///
    /// Engine errors.
    pub fn small_search(&self, params: &SearchParams) -> CoreResult<Vec<Document>> {
        let Some(selector) = self.resolve_indices(&params.doc_types)? else {
            return Ok(Vec::new());
        };
        let mut query = params.clauses.to_query();
        if let Some(filter) = &params.filter {
            query = with_filter(query, filter.clone());
        }
        let source = match &params.return_fields {
            Some(fields) => SourceFilter::Fields(fields.clone()),
            None => SourceFilter::All,
        };
        let types: HashMap<String, String> = self
            .indices_per_doc_type()?
            .into_iter()
            .map(|(doc_type, index)| (index, doc_type))
            .collect();

        let engine = self.engine()?;
        let hits: Vec<Hit> = if params.use_scan {
            let request =
                SearchRequest::new(query, self.settings.scroll.page_size).with_source(source);
            ScrollCursor::open(engine, &selector, &request, self.settings.scroll.keep_alive)?
                .collect::<CoreResult<_>>()?
        } else {
            let request = SearchRequest::new(query, DEFAULT_MAX_RESULT_WINDOW).with_source(source);
            engine.search(&selector, &request)?.hits
        };

        Ok(hits
            .into_iter()
            .map(|hit| {
                let mut doc = hit.source;
                doc.insert("id".to_string(), Value::String(hit.id));
                if let Some(doc_type) = types.get(&hit.index) {
                    doc.insert("type".to_string(), Value::String(doc_type.clone()));
                }
                doc
            })
            .collect())
    }
}

impl std::fmt::Debug for DocumentDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentDirectory")
            .field("record", &self.record)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryRegistry;
    use jass_engine::{FieldMapping, FieldType, InMemoryEngine};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn directory() -> (DocumentDirectory, Arc<InMemoryEngine>) {
        let engine = Arc::new(InMemoryEngine::new());
        let conn = Arc::new(ConnectionProvider::for_engine(engine.clone()));
        let registry = DirectoryRegistry::new(conn, &Settings::default().tenant_id("unit"));
        registry.create().unwrap();
        let dir = registry.create_directory("docs", None, true).unwrap();
        (dir, engine)
    }

    #[test]
    fn default_type_is_bound_at_creation() {
        let (dir, engine) = directory();
        assert_eq!(
            dir.binding("default").unwrap().as_deref(),
            Some("unit_dd_docs_data_0")
        );
        assert!(engine.index_exists("unit_dd_docs_data_0").unwrap());
    }

    #[test]
    fn document_lifecycle() {
        let (dir, _) = directory();
        let options = WriteOptions::new().with_id("x").with_doc_type("t");
        dir.add_or_update_document(&doc(json!({"name": "anton"})), options)
            .unwrap();
        assert_eq!(
            dir.get_document("x", "t").unwrap(),
            doc(json!({"name": "anton", "id": "x"}))
        );

        dir.update_document(&doc(json!({"age": 7})), "x", "t").unwrap();
        assert_eq!(dir.get_document("x", "t").unwrap()["age"], 7);

        dir.delete_document("x", "t").unwrap();
        assert!(dir.get_document("x", "t").unwrap_err().is_not_found());
        assert!(dir.delete_document("x", "t").unwrap_err().is_not_found());
    }

    #[test]
    fn duplicates_and_missing_targets() {
        let (dir, _) = directory();
        let body = doc(json!({"a": 1}));
        dir.add_document(&body, WriteOptions::new().with_id("1")).unwrap();
        assert!(matches!(
            dir.add_document(&body, WriteOptions::new().with_id("1")),
            Err(CoreError::AlreadyExists { .. })
        ));
        assert!(dir
            .update_document(&body, "missing", "default")
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            dir.update_document(&body, "1", "unbound"),
            Err(CoreError::NoSchemaFound { .. })
        ));
    }

    #[test]
    fn existence_checks() {
        let (dir, _) = directory();
        let id = dir
            .add_document(&doc(json!({"name": "anton", "age": 666})), WriteOptions::new())
            .unwrap();
        assert!(dir.document_exists(&id, Some("default")).unwrap());
        assert!(!dir.document_exists(&id, Some("other")).unwrap());
        assert!(dir.document_exists(&id, None).unwrap());
        assert!(!dir.document_exists("nope", None).unwrap());
    }

    #[test]
    fn strict_types_reject_undeclared_fields() {
        let (dir, _) = directory();
        let schema = EngineMapping::new().with_field("age", FieldMapping::of(FieldType::Long));
        dir.add_or_update_schema(&schema, "person", false).unwrap();
        dir.add_document(
            &doc(json!({"age": 3})),
            WriteOptions::new().with_doc_type("person"),
        )
        .unwrap();
        assert!(matches!(
            dir.add_document(
                &doc(json!({"age": 3, "city": "x"})),
                WriteOptions::new().with_doc_type("person"),
            ),
            Err(CoreError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn schema_fragments_migrate_additively() {
        let (dir, _) = directory();
        let v1 = EngineMapping::new().with_field("age", FieldMapping::of(FieldType::Long));
        let v2 = v1.clone().with_field("city", FieldMapping::of(FieldType::String));
        let options = WriteOptions::new().with_doc_type("person");

        dir.add_document(&doc(json!({"age": 1})), options.clone().with_schema(v1.clone()))
            .unwrap();
        dir.add_document(&doc(json!({"age": 2, "city": "x"})), options.clone().with_schema(v2))
            .unwrap();
        let live = dir.live_mapping("person").unwrap().unwrap();
        assert!(live.field("city").is_some());

        let redefined = EngineMapping::new().with_field("age", FieldMapping::of(FieldType::Double));
        assert!(matches!(
            dir.add_document(&doc(json!({"age": 3})), options.with_schema(redefined)),
            Err(CoreError::MigrationIncompatible { .. })
        ));
    }

    #[test]
    fn empty_doc_type_keeps_shape() {
        let (dir, engine) = directory();
        let schema = EngineMapping::new().with_field("age", FieldMapping::of(FieldType::Long));
        let index = dir.add_or_update_schema(&schema, "person", false).unwrap();
        for i in 0..5 {
            dir.add_document(&doc(json!({"age": i})), WriteOptions::new().with_doc_type("person"))
                .unwrap();
        }
        dir.empty_doc_type("person").unwrap();
        assert_eq!(engine.document_count(&index), Some(0));
        assert_eq!(dir.binding("person").unwrap(), Some(index.clone()));
        assert!(dir.live_mapping("person").unwrap().unwrap().is_strict());

        dir.add_document(&doc(json!({"age": 9})), WriteOptions::new().with_doc_type("person"))
            .unwrap();
        assert_eq!(engine.document_count(&index), Some(1));
    }

    #[test]
    fn delete_doc_type_unbinds() {
        let (dir, engine) = directory();
        dir.add_document(&doc(json!({"a": 1})), WriteOptions::new().with_doc_type("t"))
            .unwrap();
        let index = dir.binding("t").unwrap().unwrap();
        dir.delete_doc_type("t").unwrap();
        assert!(!engine.index_exists(&index).unwrap());
        assert_eq!(dir.binding("t").unwrap(), None);
        assert!(matches!(
            dir.delete_doc_type("t"),
            Err(CoreError::NoSchemaFound { .. })
        ));
    }

    #[test]
    fn bulk_reports_each_document() {
        let (dir, _) = directory();
        dir.add_document(&doc(json!({"n": 0})), WriteOptions::new().with_id("taken"))
            .unwrap();
        let outcomes = dir
            .add_documents(
                vec![
                    (Some("a".into()), doc(json!({"n": 1}))),
                    (Some("taken".into()), doc(json!({"n": 2}))),
                    (None, doc(json!({"n": 3}))),
                ],
                "default",
            )
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].error.is_none());
        assert!(matches!(outcomes[1].error, Some(CoreError::AlreadyExists { .. })));
        assert_eq!(outcomes[2].id.len(), 36);
    }

    #[test]
    fn search_tags_hits_with_id_and_type() {
        let (dir, _) = directory();
        for (id, doc_type, name) in [("1", "a", "red car"), ("2", "b", "blue car"), ("3", "a", "bike")] {
            dir.add_document(
                &doc(json!({"name": name, "owner": "x"})),
                WriteOptions::new().with_id(id).with_doc_type(doc_type),
            )
            .unwrap();
        }

        let params = SearchParams::new()
            .with_doc_types(Vec::<String>::new())
            .with_clauses(SearchClauses::new().with_match("name", "car"))
            .with_return_fields(["name"]);
        let mut hits = dir.small_search(&params).unwrap();
        hits.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        assert_eq!(
            hits,
            vec![
                doc(json!({"name": "red car", "id": "1", "type": "a"})),
                doc(json!({"name": "blue car", "id": "2", "type": "b"})),
            ]
        );

        let bounded = dir
            .small_search(&SearchParams::new().with_doc_types(["a"]).bounded())
            .unwrap();
        assert_eq!(bounded.len(), 2);

        let unbound = dir
            .small_search(&SearchParams::new().with_doc_types(["nothing"]))
            .unwrap();
        assert!(unbound.is_empty());
    }

    #[test]
    fn indices_per_doc_type_lists_bindings() {
        let (dir, _) = directory();
        dir.add_document(&doc(json!({"a": 1})), WriteOptions::new().with_doc_type("t"))
            .unwrap();
        let bindings = dir.indices_per_doc_type().unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings["default"], "unit_dd_docs_data_0");
        assert_eq!(
            dir.resolve_indices(&["default".to_string(), "t".to_string()])
                .unwrap()
                .unwrap(),
            format!("unit_dd_docs_data_0,{}", bindings["t"])
        );
    }
}
