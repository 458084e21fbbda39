//! State of a single in-memory index.

use crate::analysis::Analyzer;
use crate::engine::Document;
use crate::error::{EngineError, EngineResult};
use crate::mapping::{DynamicMode, EngineMapping, FieldMapping, FieldType};
use crate::settings::{IndexBody, IndexSettings};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

const VERSION_CREATED: &str = "2040099";

pub(crate) struct IndexState {
    pub(crate) settings: IndexSettings,
    pub(crate) mapping: EngineMapping,
    pub(crate) docs: BTreeMap<String, Document>,
}

impl IndexState {
    pub(crate) fn create(name: &str, body: &IndexBody) -> EngineResult<Self> {
        validate_index_name(name)?;
        if let Some(key) = body.settings.creation_only_key() {
            return Err(EngineError::illegal_argument(format!(
                "private index setting [index.{key}] can not be set explicitly"
            )));
        }
        if let Some(analysis) = &body.settings.analysis {
            analysis.validate()?;
        }

        let mut settings = body.settings.clone();
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        settings
            .extra
            .insert("creation_date".into(), json!(created.to_string()));
        settings.extra.insert("provided_name".into(), json!(name));
        settings
            .extra
            .insert("uuid".into(), json!(uuid::Uuid::new_v4().simple().to_string()));
        settings
            .extra
            .insert("version".into(), json!({"created": VERSION_CREATED}));

        let mut state = Self {
            settings,
            mapping: EngineMapping::new(),
            docs: BTreeMap::new(),
        };
        if let Some(mappings) = &body.mappings {
            state.put_mapping(name, mappings)?;
        }
        Ok(state)
    }

    pub(crate) fn put_mapping(&mut self, name: &str, mapping: &EngineMapping) -> EngineResult<()> {
        for (field, fm) in &mapping.properties {
            self.check_analyzers(name, field, fm)?;
        }
        self.mapping
            .merge(mapping)
            .map_err(|field| EngineError::MappingConflict {
                index: name.to_string(),
                field,
            })
    }

    fn check_analyzers(&self, name: &str, path: &str, fm: &FieldMapping) -> EngineResult<()> {
        for analyzer in [&fm.analyzer, &fm.search_analyzer].into_iter().flatten() {
            Analyzer::resolve(analyzer, self.settings.analysis.as_ref()).map_err(|_| {
                EngineError::MapperParsing {
                    index: name.to_string(),
                    field: path.to_string(),
                    reason: format!("analyzer [{analyzer}] not found"),
                }
            })?;
        }
        for (child, child_fm) in fm.properties.iter().chain(fm.fields.iter()) {
            self.check_analyzers(name, &format!("{path}.{child}"), child_fm)?;
        }
        Ok(())
    }

    /// Validates a document against the mapping and applies any dynamic
    /// additions. Nothing changes if validation fails.
    pub(crate) fn accept(&mut self, name: &str, source: &Document) -> EngineResult<()> {
        let root_dynamic = self.mapping.dynamic.unwrap_or(DynamicMode::True);
        let mut properties = self.mapping.properties.clone();
        let walker = Walker { index: name };
        walker.object(source, &mut properties, root_dynamic, "")?;
        self.mapping.properties = properties;
        Ok(())
    }
}

struct Walker<'a> {
    index: &'a str,
}

impl Walker<'_> {
    fn object(
        &self,
        object: &Document,
        properties: &mut BTreeMap<String, FieldMapping>,
        dynamic: DynamicMode,
        prefix: &str,
    ) -> EngineResult<()> {
        for (key, value) in object {
            let path = join(prefix, key);
            if value.is_null() {
                continue;
            }
            match properties.get_mut(key) {
                Some(fm) => self.value(value, fm, dynamic, &path)?,
                None => match dynamic {
                    DynamicMode::Strict => {
                        return Err(EngineError::StrictDynamicMapping {
                            index: self.index.to_string(),
                            field: path,
                        })
                    }
                    DynamicMode::False => {}
                    DynamicMode::True => {
                        if let Some(mut fm) = infer(value) {
                            self.value(value, &mut fm, dynamic, &path)?;
                            properties.insert(key.clone(), fm);
                        }
                    }
                },
            }
        }
        Ok(())
    }

    fn value(
        &self,
        value: &Value,
        fm: &mut FieldMapping,
        inherited: DynamicMode,
        path: &str,
    ) -> EngineResult<()> {
        if let Value::Array(items) = value {
            for item in items.iter().filter(|v| !v.is_null()) {
                self.value(item, fm, inherited, path)?;
            }
            return Ok(());
        }

        let Some(field_type) = fm.effective_type() else {
            return Ok(());
        };
        match (field_type, value) {
            (FieldType::Object | FieldType::Nested, Value::Object(inner)) => {
                let dynamic = fm.dynamic.unwrap_or(inherited);
                self.object(inner, &mut fm.properties, dynamic, path)
            }
            (FieldType::Object | FieldType::Nested, _) => Err(self.parse_error(
                path,
                "object mapping tried to parse field as object, but found a concrete value",
            )),
            (_, Value::Object(_)) => Err(self.parse_error(
                path,
                &format!("tried to parse field as {field_type}, but found an object"),
            )),
            (t, v) if t.is_integral() => {
                if as_integer(v).is_some() {
                    Ok(())
                } else {
                    Err(self.parse_error(path, &format!("cannot parse [{v}] as {t}")))
                }
            }
            (t, v) if t.is_numeric() => {
                if as_number(v).is_some() {
                    Ok(())
                } else {
                    Err(self.parse_error(path, &format!("cannot parse [{v}] as {t}")))
                }
            }
            (FieldType::Boolean, v) => {
                if as_bool(v).is_some() {
                    Ok(())
                } else {
                    Err(self.parse_error(path, &format!("cannot parse [{v}] as boolean")))
                }
            }
            _ => Ok(()),
        }
    }

    fn parse_error(&self, path: &str, reason: &str) -> EngineError {
        EngineError::MapperParsing {
            index: self.index.to_string(),
            field: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Mapping a dynamic index assigns to a previously unseen value.
fn infer(value: &Value) -> Option<FieldMapping> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(FieldMapping::of(FieldType::Boolean)),
        Value::Number(n) if n.is_f64() => Some(FieldMapping::of(FieldType::Double)),
        Value::Number(_) => Some(FieldMapping::of(FieldType::Long)),
        Value::String(_) => Some(FieldMapping::of(FieldType::String)),
        Value::Array(items) => items.iter().find_map(infer),
        Value::Object(_) => Some(FieldMapping::of(FieldType::Object)),
    }
}

pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

/// Index names must be lowercase and free of reserved characters.
pub(crate) fn validate_index_name(name: &str) -> EngineResult<()> {
    let reject = |reason: &str| {
        Err(EngineError::InvalidIndexName {
            index: name.to_string(),
            reason: reason.to_string(),
        })
    };
    if name.is_empty() || name == "." || name == ".." {
        return reject("must not be empty, '.' or '..'");
    }
    if name.starts_with(['_', '-', '+']) {
        return reject("must not start with '_', '-', or '+'");
    }
    if name.chars().any(char::is_uppercase) {
        return reject("must be lowercase");
    }
    if let Some(c) = name
        .chars()
        .find(|c| matches!(c, '\\' | '/' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | ',' | '#' | ':'))
    {
        return reject(&format!("must not contain '{c}'"));
    }
    Ok(())
}

/// Merges `partial` into `target`: objects merge key by key, anything else
/// replaces.
pub(crate) fn deep_merge(target: &mut Document, partial: &Document) {
    for (key, value) in partial {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
