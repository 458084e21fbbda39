//! Typed index mappings.
//!
//! The types here serialize to exactly the JSON the engine accepts in a
//! mapping body, e.g. `{"properties": {"name": {"type": "string"}}}`, so a
//! mapping can be stored, hashed and diffed without losing fidelity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Field datatype understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Analyzed or exact text, depending on `index`.
    String,
    /// Analyzed text.
    Text,
    /// Exact text.
    Keyword,
    /// 64-bit integer.
    Long,
    /// 32-bit integer.
    Integer,
    /// 16-bit integer.
    Short,
    /// 8-bit integer.
    Byte,
    /// 64-bit float.
    Double,
    /// 32-bit float.
    Float,
    /// Boolean.
    Boolean,
    /// Date, stored as text.
    Date,
    /// Inner object, flattened into its parent.
    Object,
    /// Array of objects, each element kept as its own unit.
    Nested,
}

impl FieldType {
    /// Returns true for text-like types.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Text | FieldType::Keyword | FieldType::Date
        )
    }

    /// Returns true for whole-number types.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            FieldType::Long | FieldType::Integer | FieldType::Short | FieldType::Byte
        )
    }

    /// Returns true for any numeric type.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, FieldType::Double | FieldType::Float)
    }

    /// Returns true for types that hold sub-properties.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, FieldType::Object | FieldType::Nested)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Long => "long",
            FieldType::Integer => "integer",
            FieldType::Short => "short",
            FieldType::Byte => "byte",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Nested => "nested",
        };
        f.write_str(name)
    }
}

/// How a field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOption {
    /// Stored only, never searchable.
    No,
    /// Indexed as a single exact token.
    NotAnalyzed,
    /// Indexed through an analyzer.
    Analyzed,
}

/// Whether unknown fields may be added to a mapping by writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicMode {
    /// Unknown fields are mapped on the fly.
    True,
    /// Unknown fields are stored but not mapped.
    False,
    /// Unknown fields are rejected.
    Strict,
}

impl DynamicMode {
    fn as_str(self) -> &'static str {
        match self {
            DynamicMode::True => "true",
            DynamicMode::False => "false",
            DynamicMode::Strict => "strict",
        }
    }
}

impl Serialize for DynamicMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DynamicMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bool(true) => Ok(DynamicMode::True),
            Repr::Bool(false) => Ok(DynamicMode::False),
            Repr::Str(s) => match s.as_str() {
                "true" => Ok(DynamicMode::True),
                "false" => Ok(DynamicMode::False),
                "strict" => Ok(DynamicMode::Strict),
                other => Err(serde::de::Error::custom(format!(
                    "unknown dynamic mode: {other}"
                ))),
            },
        }
    }
}

/// Mapping of a single field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Datatype; inner objects may omit it.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,

    /// Indexing behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexOption>,

    /// Analyzer used at index time (and at search time unless overridden).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,

    /// Analyzer used on query text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_analyzer: Option<String>,

    /// Dynamic behavior of an object or nested field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<DynamicMode>,

    /// Sub-properties of an object or nested field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, FieldMapping>,

    /// Alternate views of the same value, addressed as `field.name`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldMapping>,
}

impl FieldMapping {
    /// Creates a mapping of the given type.
    #[must_use]
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    /// Creates a nested mapping with the given sub-properties.
    #[must_use]
    pub fn nested(properties: BTreeMap<String, FieldMapping>) -> Self {
        Self {
            field_type: Some(FieldType::Nested),
            properties,
            ..Self::default()
        }
    }

    /// Sets the index option.
    #[must_use]
    pub fn with_index(mut self, index: IndexOption) -> Self {
        self.index = Some(index);
        self
    }

    /// Sets the analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Sets the search analyzer.
    #[must_use]
    pub fn with_search_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.search_analyzer = Some(analyzer.into());
        self
    }

    /// Sets the dynamic mode.
    #[must_use]
    pub fn with_dynamic(mut self, dynamic: DynamicMode) -> Self {
        self.dynamic = Some(dynamic);
        self
    }

    /// Adds a sub-field view.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.fields.insert(name.into(), mapping);
        self
    }

    /// Effective datatype: untyped mappings with properties are objects.
    #[must_use]
    pub fn effective_type(&self) -> Option<FieldType> {
        match self.field_type {
            Some(t) => Some(t),
            None if !self.properties.is_empty() => Some(FieldType::Object),
            None => None,
        }
    }

    /// Returns true if the value is searchable at all.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.index != Some(IndexOption::No)
    }
}

/// Mapping of a whole index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineMapping {
    /// Dynamic behavior at the document root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<DynamicMode>,

    /// Top-level fields.
    #[serde(default)]
    pub properties: BTreeMap<String, FieldMapping>,
}

impl EngineMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mapping that rejects unknown fields.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            dynamic: Some(DynamicMode::Strict),
            properties: BTreeMap::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.properties.insert(name.into(), mapping);
        self
    }

    /// Looks up a top-level field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.properties.get(name)
    }

    /// Returns true if the mapping declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns true if unknown root fields are rejected.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.dynamic == Some(DynamicMode::Strict)
    }

    /// Resolves a dotted path (`a.b`, `title.edge`) to its field mapping.
    ///
    /// Each segment descends into `properties` first and falls back to the
    /// sub-field views in `fields`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&FieldMapping> {
        let mut segments = path.split('.');
        let mut current = self.properties.get(segments.next()?)?;
        for segment in segments {
            current = current
                .properties
                .get(segment)
                .or_else(|| current.fields.get(segment))?;
        }
        Some(current)
    }

    /// Merges `other` into this mapping.
    ///
    /// New fields are added; fields present in both must be identical.
    /// On conflict nothing is modified and the conflicting path is returned.
    pub fn merge(&mut self, other: &EngineMapping) -> Result<(), String> {
        let mut merged = self.properties.clone();
        merge_properties(&mut merged, &other.properties, "")?;
        self.properties = merged;
        if other.dynamic.is_some() {
            self.dynamic = other.dynamic;
        }
        Ok(())
    }
}

fn merge_properties(
    target: &mut BTreeMap<String, FieldMapping>,
    incoming: &BTreeMap<String, FieldMapping>,
    prefix: &str,
) -> Result<(), String> {
    for (name, mapping) in incoming {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match target.get_mut(name) {
            None => {
                target.insert(name.clone(), mapping.clone());
            }
            Some(existing) if existing == mapping => {}
            Some(existing)
                if existing.effective_type().is_some_and(FieldType::is_container)
                    && existing.effective_type() == mapping.effective_type()
                    && existing.dynamic == mapping.dynamic =>
            {
                merge_properties(&mut existing.properties, &mapping.properties, &path)?;
            }
            Some(_) => return Err(path),
        }
    }
    Ok(())
}
