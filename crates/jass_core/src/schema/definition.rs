//! Author-facing schema definitions.
//!
//! A schema arrives as JSON, either as a JSON-schema envelope
//! (`{"type": "object", "properties": {...}}`) or as a bare field map
//! (`{"word": {"type": "string", ...}}`). Parsing validates every field
//! once and produces a closed [`SchemaFieldSpec`] per field, so the
//! compiler never has to inspect raw JSON.

use crate::error::{CoreError, CoreResult};
use jass_engine::FieldType;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Primitive JSON types a field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    /// `boolean`.
    Boolean,
    /// `integer`.
    Integer,
    /// `long`.
    Long,
    /// `number`.
    Number,
    /// `string`.
    String,
}

impl JsonType {
    fn parse(field: &str, name: &str) -> CoreResult<Self> {
        match name {
            "boolean" => Ok(JsonType::Boolean),
            "integer" => Ok(JsonType::Integer),
            "long" => Ok(JsonType::Long),
            "number" => Ok(JsonType::Number),
            "string" => Ok(JsonType::String),
            other => Err(CoreError::unsupported_shape(
                field,
                format!("type '{other}' has no engine counterpart"),
            )),
        }
    }

    /// Engine primitive the type is stored as.
    #[must_use]
    pub const fn engine_type(self) -> FieldType {
        match self {
            JsonType::Boolean => FieldType::Boolean,
            JsonType::Integer | JsonType::Long => FieldType::Long,
            JsonType::Number => FieldType::Double,
            JsonType::String => FieldType::String,
        }
    }
}

/// Named analysis profile applied to a field or one of its sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Exact match on the whole value.
    Noop,
    /// Standard tokenization.
    Basic,
    /// Prefix (autocomplete) tokenization.
    Edge,
    /// Substring n-grams.
    Ngram,
    /// Hierarchical path prefixes.
    Path,
    /// Natural-language analysis.
    Language,
}

impl SearchMode {
    fn parse(field: &str, name: &str) -> CoreResult<Self> {
        match name {
            "noop" => Ok(SearchMode::Noop),
            "basic" => Ok(SearchMode::Basic),
            "edge" => Ok(SearchMode::Edge),
            "ngram" => Ok(SearchMode::Ngram),
            "path" => Ok(SearchMode::Path),
            "language" => Ok(SearchMode::Language),
            other => Err(CoreError::invalid_binding(
                field,
                format!("unknown search mode '{other}'"),
            )),
        }
    }

    /// Name used in schemas and as the sub-field suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SearchMode::Noop => "noop",
            SearchMode::Basic => "basic",
            SearchMode::Edge => "edge",
            SearchMode::Ngram => "ngram",
            SearchMode::Path => "path",
            SearchMode::Language => "language",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a scalar field is made searchable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchBinding {
    /// Stored only, never indexed.
    Stored,
    /// Indexed under each mode; the first mode is the base field.
    Indexed {
        /// Non-empty, in declaration order.
        modes: Vec<SearchMode>,
        /// Language tag, present whenever `modes` holds `Language`.
        language: Option<String>,
    },
}

/// A validated field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaFieldSpec {
    /// A single primitive value.
    Scalar {
        /// Declared type.
        json_type: JsonType,
        /// Search annotations.
        binding: SearchBinding,
    },
    /// An array of primitives of one type.
    ArrayOfScalar {
        /// Element type.
        item_type: JsonType,
    },
    /// An array of objects kept as nested documents.
    NestedObjectArray {
        /// Element properties and their types.
        properties: BTreeMap<String, JsonType>,
    },
}

/// A parsed schema: field name to validated declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDefinition {
    fields: BTreeMap<String, SchemaFieldSpec>,
}

impl SchemaDefinition {
    /// Parses raw schema text.
    ///
    /// Array fields named in `nested` are read as arrays of nested objects.
    ///
    /// # Errors
    ///
    /// `InvalidSchema` if the text is not a JSON object, otherwise the
    /// first field error found.
    pub fn parse(raw: &str, nested: &[String]) -> CoreResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| CoreError::invalid_schema(err.to_string()))?;
        Self::from_value(&value, nested)
    }

    /// Parses an already decoded schema.
    ///
    /// # Errors
    ///
    /// See [`SchemaDefinition::parse`].
    pub fn from_value(value: &Value, nested: &[String]) -> CoreResult<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| CoreError::invalid_schema("schema must be a JSON object"))?;
        let declared = field_map(root);

        let mut fields = BTreeMap::new();
        for (name, spec) in declared {
            let is_nested = nested.iter().any(|n| n == name);
            fields.insert(name.clone(), parse_field(name, spec, is_nested)?);
        }
        Ok(Self { fields })
    }

    /// Iterates over fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &SchemaFieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Looks up a field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SchemaFieldSpec> {
        self.fields.get(name)
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// An envelope's `properties` is a map of field specs; a bare field named
// `properties` is itself a spec and carries a string `type`.
fn field_map(root: &Map<String, Value>) -> &Map<String, Value> {
    match root.get("properties") {
        Some(Value::Object(inner)) if !inner.get("type").is_some_and(Value::is_string) => inner,
        _ => root,
    }
}

fn type_of<'a>(field: &str, spec: &'a Map<String, Value>) -> CoreResult<&'a str> {
    spec.get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::unsupported_shape(field, "missing type"))
}

fn parse_field(name: &str, spec: &Value, nested: bool) -> CoreResult<SchemaFieldSpec> {
    let spec = spec
        .as_object()
        .ok_or_else(|| CoreError::unsupported_shape(name, "field declaration must be an object"))?;
    let declared = type_of(name, spec)?;
    if declared != "array" {
        return Ok(SchemaFieldSpec::Scalar {
            json_type: JsonType::parse(name, declared)?,
            binding: parse_binding(name, spec)?,
        });
    }

    let items = spec
        .get("items")
        .and_then(Value::as_object)
        .ok_or_else(|| CoreError::unsupported_shape(name, "array without items"))?;
    let item_type = type_of(name, items)?;

    if nested {
        if item_type != "object" {
            return Err(CoreError::unsupported_shape(
                name,
                "nested arrays must hold objects",
            ));
        }
        let props = items
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| CoreError::unsupported_shape(name, "nested items without properties"))?;
        let mut properties = BTreeMap::new();
        for (sub, sub_spec) in props {
            let path = format!("{name}.{sub}");
            let sub_spec = sub_spec
                .as_object()
                .ok_or_else(|| CoreError::unsupported_shape(&path, "missing type"))?;
            let sub_type = JsonType::parse(&path, type_of(&path, sub_spec)?)?;
            properties.insert(sub.clone(), sub_type);
        }
        return Ok(SchemaFieldSpec::NestedObjectArray { properties });
    }

    if item_type == "object" {
        return Err(CoreError::unsupported_shape(
            name,
            "arrays of objects must be declared nested",
        ));
    }
    Ok(SchemaFieldSpec::ArrayOfScalar {
        item_type: JsonType::parse(name, item_type)?,
    })
}

fn parse_binding(name: &str, spec: &Map<String, Value>) -> CoreResult<SearchBinding> {
    let searchable = match spec.get("searchable") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(CoreError::invalid_binding(name, "searchable must be a boolean")),
    };
    if !searchable {
        return Ok(SearchBinding::Stored);
    }

    let modes = match spec.get("searchModes") {
        None => return Err(CoreError::invalid_binding(name, "searchModes missing")),
        Some(Value::Array(modes)) if modes.is_empty() => {
            return Err(CoreError::invalid_binding(name, "searchModes is empty"))
        }
        Some(Value::Array(modes)) => modes
            .iter()
            .map(|mode| {
                mode.as_str()
                    .ok_or_else(|| CoreError::invalid_binding(name, "search modes must be strings"))
                    .and_then(|mode| SearchMode::parse(name, mode))
            })
            .collect::<CoreResult<Vec<_>>>()?,
        Some(_) => return Err(CoreError::invalid_binding(name, "searchModes must be a list")),
    };

    let language = spec
        .get("language")
        .and_then(Value::as_str)
        .map(str::to_string);
    if language.is_none() && modes.contains(&SearchMode::Language) {
        return Err(CoreError::invalid_binding(
            name,
            "search mode 'language' requires a language",
        ));
    }
    Ok(SearchBinding::Indexed { modes, language })
}
