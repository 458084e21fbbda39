//! Boolean query assembly and span filters.

use jass_engine::{BoolQuery, Query, RangeQuery, ScoreMode};
use serde_json::Value;

/// Nested path span-annotated documents keep their offsets under.
pub const OFFSETS_PATH: &str = "offsets";

/// Field clauses of a small search.
///
/// Scored clauses go to `must`, unscored ones to `filter`. A term value
/// that is an array matches any of its elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchClauses {
    /// Analyzed matches, scored.
    pub match_fields: Vec<(String, String)>,
    /// Exact terms, scored.
    pub term_fields: Vec<(String, Value)>,
    /// Analyzed matches, unscored.
    pub filter_match: Vec<(String, String)>,
    /// Exact terms, unscored.
    pub filter_terms: Vec<(String, Value)>,
}

impl SearchClauses {
    /// Creates an empty set of clauses, which matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scored match clause.
    #[must_use]
    pub fn with_match(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.match_fields.push((field.into(), text.into()));
        self
    }

    /// Adds a scored term clause.
    #[must_use]
    pub fn with_term(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term_fields.push((field.into(), value.into()));
        self
    }

    /// Adds an unscored match clause.
    #[must_use]
    pub fn with_filter_match(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.filter_match.push((field.into(), text.into()));
        self
    }

    /// Adds an unscored term clause.
    #[must_use]
    pub fn with_filter_term(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter_terms.push((field.into(), value.into()));
        self
    }

    /// Returns true if no clause is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.match_fields.is_empty()
            && self.term_fields.is_empty()
            && self.filter_match.is_empty()
            && self.filter_terms.is_empty()
    }

    /// Builds the query: `match_all` without clauses, otherwise one bool query.
    #[must_use]
    pub fn to_query(&self) -> Query {
        build_bool_query(self)
    }
}

fn term_clause(field: &str, value: &Value) -> Query {
    match value {
        Value::Array(values) => Query::terms(field, values.clone()),
        other => Query::term(field, other.clone()),
    }
}

/// Combines clauses into a single boolean query.
#[must_use]
pub fn build_bool_query(clauses: &SearchClauses) -> Query {
    if clauses.is_empty() {
        return Query::MatchAll;
    }
    let mut query = BoolQuery::new();
    for (field, value) in &clauses.filter_terms {
        query = query.filter(term_clause(field, value));
    }
    for (field, text) in &clauses.filter_match {
        query = query.filter(Query::matching(field.as_str(), text.as_str()));
    }
    for (field, value) in &clauses.term_fields {
        query = query.must(term_clause(field, value));
    }
    for (field, text) in &clauses.match_fields {
        query = query.must(Query::matching(field.as_str(), text.as_str()));
    }
    query.into()
}

/// A one-dimensional offset interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// Lower bound.
    pub begin: i64,
    /// Upper bound.
    pub end: i64,
    /// Excludes `begin` itself.
    pub open_begin: bool,
    /// Excludes `end` itself.
    pub open_end: bool,
}

impl Interval {
    /// `[begin, end]`.
    #[must_use]
    pub const fn closed(begin: i64, end: i64) -> Self {
        Self {
            begin,
            end,
            open_begin: false,
            open_end: false,
        }
    }

    /// `(begin, end)`.
    #[must_use]
    pub const fn open(begin: i64, end: i64) -> Self {
        Self {
            begin,
            end,
            open_begin: true,
            open_end: true,
        }
    }

    /// Inclusive integer bounds; open ends shrink by one.
    #[must_use]
    pub const fn bounds(&self) -> (i64, i64) {
        let begin = if self.open_begin {
            self.begin.saturating_add(1)
        } else {
            self.begin
        };
        let end = if self.open_end {
            self.end.saturating_sub(1)
        } else {
            self.end
        };
        (begin, end)
    }
}

/// Which spans a span filter keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanMatch {
    /// Spans inside the interval, or spanning all of it.
    #[default]
    Nesting,
    /// Spans sharing at least one offset with the interval.
    Overlap,
}

/// Non-scoring nested filter selecting documents with a span under `path`
/// (`path.begin`, `path.end`) that relates to `interval` as `mode` asks.
#[must_use]
pub fn span_filter(path: &str, interval: &Interval, mode: SpanMatch) -> Query {
    let (begin, end) = interval.bounds();
    let begin_field = format!("{path}.begin");
    let end_field = format!("{path}.end");

    let covering = BoolQuery::new()
        .must(RangeQuery::new(begin_field.as_str()).lte(begin).into())
        .must(RangeQuery::new(end_field.as_str()).gte(end).into());
    let near = match mode {
        SpanMatch::Nesting => BoolQuery::new()
            .must(RangeQuery::new(begin_field.as_str()).gte(begin).into())
            .must(RangeQuery::new(end_field.as_str()).lte(end).into()),
        SpanMatch::Overlap => BoolQuery::new()
            .should(RangeQuery::new(begin_field.as_str()).gte(begin).lte(end).into())
            .should(RangeQuery::new(end_field.as_str()).gte(begin).lte(end).into()),
    };

    Query::nested(
        path,
        ScoreMode::None,
        BoolQuery::new().should(near.into()).should(covering.into()).into(),
    )
}

/// Adds `filter` to `query` without affecting its scoring.
#[must_use]
pub fn with_filter(query: Query, filter: Query) -> Query {
    match query {
        Query::MatchAll => BoolQuery::new().filter(filter).into(),
        Query::Bool(bool_query) => bool_query.filter(filter).into(),
        other => BoolQuery::new().must(other).filter(filter).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_clauses_match_everything() {
        assert_eq!(SearchClauses::new().to_query(), Query::MatchAll);
    }

    #[test]
    fn clauses_split_between_must_and_filter() {
        let query = SearchClauses::new()
            .with_match("title", "red car")
            .with_term("lang", json!(["fr", "en"]))
            .with_filter_term("_documentID", "d1")
            .with_filter_match("body", "car")
            .to_query();
        assert_eq!(
            query.to_json(),
            json!({"bool": {
                "must": [
                    {"terms": {"lang": ["fr", "en"]}},
                    {"match": {"title": "red car"}}
                ],
                "filter": [
                    {"term": {"_documentID": "d1"}},
                    {"match": {"body": "car"}}
                ]
            }})
        );
    }

    #[test]
    fn open_bounds_shrink() {
        assert_eq!(Interval::open(3, 6).bounds(), (4, 5));
        assert_eq!(Interval::closed(3, 6).bounds(), (3, 6));
        assert_eq!(
            Interval::open(i64::MAX, i64::MIN).bounds(),
            (i64::MAX, i64::MIN)
        );
    }

    #[test]
    fn nesting_filter_renders() {
        let filter = span_filter(OFFSETS_PATH, &Interval::closed(10, 20), SpanMatch::Nesting);
        assert_eq!(
            filter.to_json(),
            json!({"nested": {
                "path": "offsets",
                "score_mode": "none",
                "query": {"bool": {"should": [
                    {"bool": {"must": [
                        {"range": {"offsets.begin": {"gte": 10}}},
                        {"range": {"offsets.end": {"lte": 20}}}
                    ]}},
                    {"bool": {"must": [
                        {"range": {"offsets.begin": {"lte": 10}}},
                        {"range": {"offsets.end": {"gte": 20}}}
                    ]}}
                ]}}
            }})
        );
    }

    #[test]
    fn filters_compose() {
        let filter = span_filter("spans", &Interval::closed(0, 1), SpanMatch::Overlap);

        let from_all = with_filter(Query::MatchAll, filter.clone());
        assert_eq!(from_all, BoolQuery::new().filter(filter.clone()).into());

        let base = SearchClauses::new().with_filter_term("doc", "d").to_query();
        let Query::Bool(combined) = with_filter(base, filter.clone()) else {
            panic!("expected a bool query");
        };
        assert_eq!(combined.filter.len(), 2);

        let Query::Bool(wrapped) = with_filter(Query::term("a", 1), filter) else {
            panic!("expected a bool query");
        };
        assert_eq!(wrapped.must, vec![Query::term("a", 1)]);
    }
}
