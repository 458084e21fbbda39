//! Content-addressed schema registry.
//!
//! Two indices per tenant: one maps schema ids to their raw text and the
//! hash of their compiled mapping, the other maps mapping hashes to the
//! compiled mappings themselves. Identical mappings are stored once no
//! matter how many schemas compile to them.

use crate::codec::{from_document, to_document};
use crate::config::{IndexDefaults, SchemaSettings, Settings};
use crate::connection::ConnectionProvider;
use crate::error::{CoreError, CoreResult};
use crate::language::LanguageManager;
use crate::naming;
use crate::schema::canonical::{hash_mapping, hash_schema_identity};
use crate::schema::compiler::SchemaCompiler;
use crate::schema::definition::SchemaDefinition;
use jass_engine::{
    BoolQuery, Document, EngineError, EngineMapping, FieldMapping, FieldType, Hit, IndexBody,
    IndexOption, IndexSettings, Query, SearchRequest, DEFAULT_MAX_RESULT_WINDOW,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const ES_SCHEMA_FIELD: &str = "esSchema";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSchema {
    json_schema_hash: String,
    es_hash: String,
    json_schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// A registered schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistryEntry {
    /// Registry id.
    pub id: String,
    /// Identity hash of the raw text.
    pub json_schema_hash: String,
    /// Hash of the compiled mapping.
    pub es_hash: String,
    /// The raw schema text as submitted.
    pub json_schema: String,
    /// Display name.
    pub name: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

impl SchemaRegistryEntry {
    fn from_stored(id: String, stored: StoredSchema) -> Self {
        Self {
            id,
            json_schema_hash: stored.json_schema_hash,
            es_hash: stored.es_hash,
            json_schema: stored.json_schema,
            name: stored.name,
            description: stored.description,
        }
    }

    /// Decodes the raw schema text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the stored text is not JSON.
    pub fn schema(&self) -> CoreResult<Value> {
        serde_json::from_str(&self.json_schema).map_err(|err| CoreError::invalid_schema(err.to_string()))
    }
}

/// Optional attributes of a new registry entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMetadata {
    /// Explicit id; a random one is generated when absent.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

impl SchemaMetadata {
    /// Creates empty metadata.
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

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Criteria for [`SchemaRegistry::find_schemas`]. All given criteria must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaQuery {
    /// Full-text match on the name.
    pub name: Option<String>,
    /// Full-text match on the description.
    pub description: Option<String>,
    /// Exact identity hash.
    pub json_schema_hash: Option<String>,
    /// Exact mapping hash.
    pub es_hash: Option<String>,
}

impl SchemaQuery {
    fn to_query(&self) -> Query {
        let mut bool_query = BoolQuery::new();
        if let Some(name) = &self.name {
            bool_query = bool_query.must(Query::matching("name", name.as_str()));
        }
        if let Some(description) = &self.description {
            bool_query = bool_query.must(Query::matching("description", description.as_str()));
        }
        if let Some(hash) = &self.json_schema_hash {
            bool_query = bool_query.must(Query::term("jsonSchemaHash", hash.as_str()));
        }
        if let Some(hash) = &self.es_hash {
            bool_query = bool_query.must(Query::term("esHash", hash.as_str()));
        }
        if bool_query.is_empty() {
            Query::MatchAll
        } else {
            bool_query.into()
        }
    }
}

/// The tenant's schema registry.
#[derive(Debug)]
pub struct SchemaRegistry {
    conn: Arc<ConnectionProvider>,
    tenant_id: String,
    schema: SchemaSettings,
    index: IndexDefaults,
    compiler: SchemaCompiler,
    json_index: String,
    es_index: String,
}

impl SchemaRegistry {
    /// Creates a handle on the registry of `settings.tenant_id`.
    ///
    /// Nothing is sent to the engine until an operation is called.
    pub fn new(conn: Arc<ConnectionProvider>, settings: &Settings) -> Self {
        let schema = settings.schema.clone();
        let prefix = format!("{}{}", settings.tenant_id, schema.class_prefix);
        Self {
            conn,
            tenant_id: settings.tenant_id.clone(),
            json_index: format!("{prefix}{}", schema.json_schemas_suffix),
            es_index: format!("{prefix}{}", schema.es_schemas_suffix),
            schema,
            index: settings.index,
            compiler: SchemaCompiler::new(LanguageManager::from_settings(settings)),
        }
    }

    /// Index holding schema entries.
    #[must_use]
    pub fn json_index(&self) -> &str {
        &self.json_index
    }

    /// Index holding compiled mappings.
    #[must_use]
    pub fn es_index(&self) -> &str {
        &self.es_index
    }

    /// The compiler used on registration.
    #[must_use]
    pub fn compiler(&self) -> &SchemaCompiler {
        &self.compiler
    }

    fn entry_mapping() -> EngineMapping {
        let exact = FieldMapping::of(FieldType::String).with_index(IndexOption::NotAnalyzed);
        EngineMapping::new()
            .with_field("jsonSchemaHash", exact.clone())
            .with_field("esHash", exact)
            .with_field(
                "jsonSchema",
                FieldMapping::of(FieldType::String).with_index(IndexOption::No),
            )
            .with_field("name", FieldMapping::of(FieldType::String))
            .with_field("description", FieldMapping::of(FieldType::String))
    }

    fn stored_mapping() -> EngineMapping {
        EngineMapping::new().with_field(
            ES_SCHEMA_FIELD,
            FieldMapping::of(FieldType::String).with_index(IndexOption::No),
        )
    }

    /// Provisions both registry indices. Existing indices are kept.
    ///
    /// # Errors
    ///
    /// `InvalidName` if the tenant id produces an unsafe index name.
    pub fn create(&self) -> CoreResult<()> {
        let class_prefix = &self.schema.class_prefix;
        for name in [&self.es_index, &self.json_index] {
            if !naming::valid_for_create(name, &self.tenant_id, class_prefix) {
                return Err(CoreError::invalid_name(name.as_str()));
            }
        }

        self.conn.wait_ready()?;
        let engine = self.conn.engine()?;
        let settings = IndexSettings::new(self.index.number_of_shards, self.index.number_of_replicas);
        for (name, mapping) in [
            (&self.es_index, Self::stored_mapping()),
            (&self.json_index, Self::entry_mapping()),
        ] {
            let body = IndexBody::new(settings.clone()).with_mappings(mapping);
            match engine.create_index(name, &body) {
                Ok(()) => info!(index = %name, "schema registry index created"),
                Err(EngineError::IndexAlreadyExists { .. }) => {
                    debug!(index = %name, "schema registry index already exists");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Deletes both registry indices. Missing indices are ignored.
    ///
    /// # Errors
    ///
    /// `InvalidName` if the selector fails the naming guard.
    pub fn delete(&self) -> CoreResult<()> {
        let selector = format!("{},{}", self.json_index, self.es_index);
        if !naming::valid_for_delete(&selector, &self.tenant_id, &self.schema.class_prefix) {
            return Err(CoreError::invalid_name(selector));
        }
        self.conn.wait_ready()?;
        let engine = self.conn.engine()?;
        for name in [&self.json_index, &self.es_index] {
            match engine.delete_index(name) {
                Ok(_) | Err(EngineError::IndexNotFound { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        info!(tenant = %self.tenant_id, "schema registry deleted");
        Ok(())
    }

    /// Returns true if both registry indices exist.
    pub fn exists(&self) -> CoreResult<bool> {
        let engine = self.conn.engine()?;
        Ok(engine.index_exists(&self.json_index)? && engine.index_exists(&self.es_index)?)
    }

    /// Registers a schema under its identity hash.
    ///
    /// Submitting the same raw text again returns the same id and leaves a
    /// single entry.
    ///
    /// # Errors
    ///
    /// Parse errors of the schema, or engine errors.
    pub fn register_schema(&self, raw: &str, nested: &[String]) -> CoreResult<String> {
        let id = hash_schema_identity(raw);
        if self.find_entry(&id)?.is_some() {
            debug!(id = %id, "schema already registered");
            return Ok(id);
        }
        match self.add_schema(raw, SchemaMetadata::new().with_id(id.as_str()), nested) {
            Err(CoreError::AlreadyExists { .. }) => Ok(id),
            other => other,
        }
    }

    /// Compiles `raw`, stores its mapping and adds a registry entry.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if an explicit id is taken, parse errors of the
    /// schema, or engine errors.
    pub fn add_schema(
        &self,
        raw: &str,
        metadata: SchemaMetadata,
        nested: &[String],
    ) -> CoreResult<String> {
        let definition = SchemaDefinition::parse(raw, nested)?;
        let es_hash = self.add_mapping(&self.compiler.compile(&definition))?;

        let id = metadata
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let stored = StoredSchema {
            json_schema_hash: hash_schema_identity(raw),
            es_hash,
            json_schema: raw.to_string(),
            name: metadata.name,
            description: metadata.description,
        };

        let engine = self.conn.engine()?;
        match engine.create_document(&self.json_index, &id, &to_document(&stored)?) {
            Ok(()) => {
                info!(id = %id, es_hash = %stored.es_hash, "schema registered");
                Ok(id)
            }
            Err(EngineError::VersionConflict { .. }) => {
                warn!(id = %id, "schema id already taken");
                Err(CoreError::already_exists("schema", id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Stores a compiled mapping under its hash, once.
    ///
    /// # Errors
    ///
    /// Engine errors.
    pub fn add_mapping(&self, mapping: &EngineMapping) -> CoreResult<String> {
        let es_hash = hash_mapping(mapping)?;
        let engine = self.conn.engine()?;
        if engine.get_document(&self.es_index, &es_hash)?.is_some() {
            return Ok(es_hash);
        }

        let text =
            serde_json::to_string(mapping).map_err(|err| CoreError::invalid_schema(err.to_string()))?;
        let mut doc = Document::new();
        doc.insert(ES_SCHEMA_FIELD.to_string(), Value::String(text));
        match engine.create_document(&self.es_index, &es_hash, &doc) {
            Ok(()) => debug!(es_hash = %es_hash, "mapping stored"),
            Err(EngineError::VersionConflict { .. }) => {}
            Err(err) => return Err(err.into()),
        }
        Ok(es_hash)
    }

    /// Fetches a compiled mapping by hash.
    ///
    /// # Errors
    ///
    /// `NotFound` if no mapping has that hash.
    pub fn get_mapping(&self, es_hash: &str) -> CoreResult<EngineMapping> {
        let doc = self
            .conn
            .engine()?
            .get_document(&self.es_index, es_hash)?
            .ok_or_else(|| CoreError::not_found("mapping", es_hash))?;
        let text = doc
            .get(ES_SCHEMA_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::invalid_schema(format!("mapping {es_hash} has no body")))?;
        serde_json::from_str(text).map_err(|err| CoreError::invalid_schema(err.to_string()))
    }

    fn find_entry(&self, id: &str) -> CoreResult<Option<SchemaRegistryEntry>> {
        let Some(doc) = self.conn.engine()?.get_document(&self.json_index, id)? else {
            return Ok(None);
        };
        let stored: StoredSchema = from_document(id, doc)?;
        Ok(Some(SchemaRegistryEntry::from_stored(id.to_string(), stored)))
    }

    /// Fetches a registry entry.
    ///
    /// # Errors
    ///
    /// `NotFound` if no entry has that id.
    pub fn get_schema_info(&self, id: &str) -> CoreResult<SchemaRegistryEntry> {
        self.find_entry(id)?
            .ok_or_else(|| CoreError::not_found("schema", id))
    }

    /// Lists entries matching every given criterion, in id order.
    ///
    /// At most one bounded page is returned.
    ///
    /// # Errors
    ///
    /// Engine errors.
    pub fn find_schemas(&self, query: &SchemaQuery) -> CoreResult<Vec<SchemaRegistryEntry>> {
        let request = SearchRequest::new(query.to_query(), DEFAULT_MAX_RESULT_WINDOW);
        let response = self.conn.engine()?.search(&self.json_index, &request)?;
        response
            .hits
            .into_iter()
            .map(|Hit { id, source, .. }| {
                let stored: StoredSchema = from_document(&id, source)?;
                Ok(SchemaRegistryEntry::from_stored(id, stored))
            })
            .collect()
    }
}
