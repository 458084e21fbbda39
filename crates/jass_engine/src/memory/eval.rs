//! Query evaluation against stored documents.

use super::index::{as_bool, as_number};
use crate::analysis::{AnalysisSettings, Analyzer};
use crate::engine::{Document, SourceFilter};
use crate::error::{EngineError, EngineResult};
use crate::mapping::{EngineMapping, FieldMapping, FieldType, IndexOption};
use crate::query::{BoolQuery, Query, RangeQuery};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Evaluates queries for one index.
pub(crate) struct Evaluator<'a> {
    mapping: &'a EngineMapping,
    analysis: Option<&'a AnalysisSettings>,
}

/// A nested element in scope, addressed by its path from the root.
struct Scope<'d> {
    path: String,
    element: &'d Value,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(mapping: &'a EngineMapping, analysis: Option<&'a AnalysisSettings>) -> Self {
        Self { mapping, analysis }
    }

    pub(crate) fn matches(&self, query: &Query, id: &str, doc: &Document) -> EngineResult<bool> {
        self.eval(query, id, doc, &mut Vec::new())
    }

    fn eval<'d>(
        &self,
        query: &Query,
        id: &str,
        root: &'d Document,
        scopes: &mut Vec<Scope<'d>>,
    ) -> EngineResult<bool> {
        match query {
            Query::MatchAll => Ok(true),
            Query::Ids(ids) => Ok(ids.iter().any(|candidate| candidate == id)),
            Query::Term { field, value } => {
                let (fm, values) = self.field_values(field, root, scopes);
                Ok(values.iter().any(|v| self.term_matches(fm, v, value)))
            }
            Query::Terms { field, values: wanted } => {
                let (fm, values) = self.field_values(field, root, scopes);
                Ok(values
                    .iter()
                    .any(|v| wanted.iter().any(|w| self.term_matches(fm, v, w))))
            }
            Query::Match { field, text } => {
                let (fm, values) = self.field_values(field, root, scopes);
                self.text_matches(fm, &values, text)
            }
            Query::Range(range) => {
                let (fm, values) = self.field_values(&range.field, root, scopes);
                if fm.is_some_and(|f| !f.is_indexed()) {
                    return Ok(false);
                }
                Ok(values.iter().any(|v| in_range(v, range)))
            }
            Query::Bool(bool_query) => self.eval_bool(bool_query, id, root, scopes),
            Query::Nested { path, query, .. } => {
                let is_nested = self
                    .mapping
                    .resolve(path)
                    .and_then(FieldMapping::effective_type)
                    == Some(FieldType::Nested);
                if !is_nested {
                    return Err(EngineError::illegal_argument(format!(
                        "[nested] nested object under path [{path}] is not of nested type"
                    )));
                }
                let elements = self.raw_values(path, root, scopes);
                for element in elements {
                    scopes.push(Scope {
                        path: path.clone(),
                        element,
                    });
                    let hit = self.eval(query, id, root, scopes);
                    scopes.pop();
                    if hit? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn eval_bool<'d>(
        &self,
        query: &BoolQuery,
        id: &str,
        root: &'d Document,
        scopes: &mut Vec<Scope<'d>>,
    ) -> EngineResult<bool> {
        for clause in query.must.iter().chain(query.filter.iter()) {
            if !self.eval(clause, id, root, scopes)? {
                return Ok(false);
            }
        }
        for clause in &query.must_not {
            if self.eval(clause, id, root, scopes)? {
                return Ok(false);
            }
        }
        if query.must.is_empty() && query.filter.is_empty() && !query.should.is_empty() {
            for clause in &query.should {
                if self.eval(clause, id, root, scopes)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Resolves a field path to its mapping and the document values it
    /// addresses. Sub-field segments (`title.edge`) select a mapping without
    /// descending into the document.
    fn field_values<'d>(
        &self,
        path: &str,
        root: &'d Document,
        scopes: &[Scope<'d>],
    ) -> (Option<&'a FieldMapping>, Vec<&'d Value>) {
        let mut doc_path: Vec<&str> = Vec::new();
        let mut current: Option<&'a FieldMapping> = None;
        let mut unmapped = false;

        for (i, segment) in path.split('.').enumerate() {
            if unmapped {
                doc_path.push(segment);
                continue;
            }
            let next_property = match (i, current) {
                (0, _) => self.mapping.properties.get(segment),
                (_, Some(fm)) => fm.properties.get(segment),
                (_, None) => None,
            };
            if let Some(fm) = next_property {
                doc_path.push(segment);
                current = Some(fm);
            } else if let Some(sub) = current.and_then(|fm| fm.fields.get(segment)) {
                current = Some(sub);
            } else {
                doc_path.push(segment);
                current = None;
                unmapped = true;
            }
        }

        let values = self.raw_values(&doc_path.join("."), root, scopes);
        (current, values)
    }

    /// Values at a document path, flattening arrays. Paths under a nested
    /// scope resolve against the scoped element.
    fn raw_values<'d>(&self, path: &str, root: &'d Document, scopes: &[Scope<'d>]) -> Vec<&'d Value> {
        for scope in scopes.iter().rev() {
            if let Some(rest) = path
                .strip_prefix(scope.path.as_str())
                .and_then(|r| r.strip_prefix('.'))
            {
                let mut out = Vec::new();
                collect(scope.element, &rest.split('.').collect::<Vec<_>>(), &mut out);
                return out;
            }
        }
        let segments: Vec<&str> = path.split('.').collect();
        let mut out = Vec::new();
        if let Some((first, rest)) = segments.split_first() {
            if let Some(value) = root.get(*first) {
                collect(value, rest, &mut out);
            }
        }
        out
    }

    fn analyzer_for(&self, fm: Option<&FieldMapping>, search: bool) -> Option<Analyzer> {
        let Some(fm) = fm else {
            return Some(Analyzer::standard());
        };
        if fm.index == Some(IndexOption::NotAnalyzed) || fm.field_type == Some(FieldType::Keyword)
        {
            return Some(Analyzer::keyword());
        }
        let name = if search {
            fm.search_analyzer.as_ref().or(fm.analyzer.as_ref())
        } else {
            fm.analyzer.as_ref()
        };
        match name {
            Some(name) => Analyzer::resolve(name, self.analysis).ok(),
            None => Some(Analyzer::standard()),
        }
    }

    fn term_matches(&self, fm: Option<&FieldMapping>, stored: &Value, wanted: &Value) -> bool {
        if fm.is_some_and(|f| !f.is_indexed()) {
            return false;
        }
        match fm.and_then(FieldMapping::effective_type) {
            Some(t) if t.is_numeric() => match (as_number(stored), as_number(wanted)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Some(FieldType::Boolean) => match (as_bool(stored), as_bool(wanted)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Some(t) if t.is_container() => false,
            Some(_) => {
                let (Some(text), Some(term)) = (scalar_text(stored), scalar_text(wanted)) else {
                    return false;
                };
                match self.analyzer_for(fm, false) {
                    Some(analyzer) => analyzer.analyze(&text).iter().any(|t| *t == term),
                    None => false,
                }
            }
            None => match (stored, wanted) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    match (scalar_text(stored), scalar_text(wanted)) {
                        (Some(text), Some(term)) => Analyzer::standard()
                            .analyze(&text)
                            .iter()
                            .any(|t| *t == term),
                        _ => false,
                    }
                }
                _ => scalar_eq(stored, wanted),
            },
        }
    }

    fn text_matches(
        &self,
        fm: Option<&FieldMapping>,
        values: &[&Value],
        text: &str,
    ) -> EngineResult<bool> {
        if fm.is_some_and(|f| !f.is_indexed()) {
            return Ok(false);
        }
        match fm.and_then(FieldMapping::effective_type) {
            Some(t) if t.is_numeric() || t == FieldType::Boolean => {
                let wanted = Value::String(text.to_string());
                Ok(values.iter().any(|v| self.term_matches(fm, v, &wanted)))
            }
            Some(t) if t.is_container() => Ok(false),
            _ => {
                let (Some(index_analyzer), Some(search_analyzer)) =
                    (self.analyzer_for(fm, false), self.analyzer_for(fm, true))
                else {
                    return Ok(false);
                };
                let wanted = search_analyzer.analyze(text);
                Ok(values.iter().filter_map(|v| scalar_text(v)).any(|stored| {
                    let tokens = index_analyzer.analyze(&stored);
                    wanted.iter().any(|w| tokens.contains(w))
                }))
            }
        }
    }
}

fn collect<'d>(value: &'d Value, path: &[&str], out: &mut Vec<&'d Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect(item, path, out);
            }
        }
        Value::Null => {}
        _ => match path.split_first() {
            None => out.push(value),
            Some((first, rest)) => {
                if let Some(child) = value.as_object().and_then(|o| o.get(*first)) {
                    collect(child, rest, out);
                }
            }
        },
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(stored: &Value, bound: &Value) -> Option<Ordering> {
    match (as_number(stored), as_number(bound)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (stored, bound) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

fn in_range(stored: &Value, range: &RangeQuery) -> bool {
    let check = |bound: &Option<Value>, accept: fn(Ordering) -> bool| match bound {
        None => true,
        Some(b) => compare(stored, b).is_some_and(accept),
    };
    check(&range.gte, |o| o != Ordering::Less)
        && check(&range.gt, |o| o == Ordering::Greater)
        && check(&range.lte, |o| o != Ordering::Greater)
        && check(&range.lt, |o| o == Ordering::Less)
}

/// Applies a source filter to a stored document.
pub(crate) fn project(doc: &Document, filter: &SourceFilter) -> Document {
    match filter {
        SourceFilter::All => doc.clone(),
        SourceFilter::Fields(fields) => {
            let mut out = Map::new();
            for field in fields {
                copy_path(doc, &mut out, &field.split('.').collect::<Vec<_>>());
            }
            out
        }
    }
}

fn copy_path(from: &Document, to: &mut Document, path: &[&str]) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    let Some(value) = from.get(*first) else {
        return;
    };
    if rest.is_empty() {
        to.insert((*first).to_string(), value.clone());
        return;
    }
    if let Value::Object(inner) = value {
        let entry = to
            .entry((*first).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(target) = entry {
            copy_path(inner, target, rest);
        }
    }
}
