//! Query model.
//!
//! A closed set of query shapes, rendered to the engine's JSON DSL with
//! [`Query::to_json`].

use serde_json::{json, Map, Value};

/// How the scores of matching nested elements combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMode {
    /// Average score.
    #[default]
    Avg,
    /// Highest score.
    Max,
    /// Lowest score.
    Min,
    /// Summed score.
    Sum,
    /// Nested matches do not contribute to scoring.
    None,
}

impl ScoreMode {
    /// Name used in the query DSL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ScoreMode::Avg => "avg",
            ScoreMode::Max => "max",
            ScoreMode::Min => "min",
            ScoreMode::Sum => "sum",
            ScoreMode::None => "none",
        }
    }
}

/// Bounds of a range query. Unset bounds are open.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeQuery {
    /// Field compared.
    pub field: String,
    /// Inclusive lower bound.
    pub gte: Option<Value>,
    /// Exclusive lower bound.
    pub gt: Option<Value>,
    /// Inclusive upper bound.
    pub lte: Option<Value>,
    /// Exclusive upper bound.
    pub lt: Option<Value>,
}

impl RangeQuery {
    /// Creates an unbounded range on a field.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Sets the inclusive lower bound.
    #[must_use]
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    /// Sets the exclusive lower bound.
    #[must_use]
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    /// Sets the inclusive upper bound.
    #[must_use]
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    /// Sets the exclusive upper bound.
    #[must_use]
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }
}

/// Boolean combination of queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    /// Clauses that must match and contribute to the score.
    pub must: Vec<Query>,
    /// Clauses that must match without scoring.
    pub filter: Vec<Query>,
    /// Optional clauses; at least one must match when there are no
    /// `must` or `filter` clauses.
    pub should: Vec<Query>,
    /// Clauses that must not match.
    pub must_not: Vec<Query>,
}

impl BoolQuery {
    /// Creates an empty bool query, which matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `must` clause.
    #[must_use]
    pub fn must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    /// Adds a `filter` clause.
    #[must_use]
    pub fn filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    /// Adds a `should` clause.
    #[must_use]
    pub fn should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    /// Adds a `must_not` clause.
    #[must_use]
    pub fn must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    /// Returns true if no clause is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.filter.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
    }
}

/// A search query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every document.
    MatchAll,
    /// Matches documents by id.
    Ids(Vec<String>),
    /// Exact token match.
    Term {
        /// Field path.
        field: String,
        /// Value compared.
        value: Value,
    },
    /// Exact match against any of several values.
    Terms {
        /// Field path.
        field: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Analyzed full-text match.
    Match {
        /// Field path.
        field: String,
        /// Query text.
        text: String,
    },
    /// Numeric or lexical range.
    Range(RangeQuery),
    /// Boolean combination.
    Bool(BoolQuery),
    /// Query evaluated against each element of a nested field.
    Nested {
        /// Path of the nested field.
        path: String,
        /// Score combination.
        score_mode: ScoreMode,
        /// Inner query, with paths relative to the document root.
        query: Box<Query>,
    },
}

impl Query {
    /// Creates a term query.
    #[must_use]
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a terms query.
    #[must_use]
    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
        Query::Terms {
            field: field.into(),
            values,
        }
    }

    /// Creates a match query.
    #[must_use]
    pub fn matching(field: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Match {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Creates an ids query.
    #[must_use]
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Creates a nested query.
    #[must_use]
    pub fn nested(path: impl Into<String>, score_mode: ScoreMode, query: Query) -> Self {
        Query::Nested {
            path: path.into(),
            score_mode,
            query: Box::new(query),
        }
    }

    /// Renders the query as engine JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({"match_all": {}}),
            Query::Ids(ids) => json!({"ids": {"values": ids}}),
            Query::Term { field, value } => json!({"term": {field: value}}),
            Query::Terms { field, values } => json!({"terms": {field: values}}),
            Query::Match { field, text } => json!({"match": {field: text}}),
            Query::Range(range) => {
                let mut bounds = Map::new();
                for (key, bound) in [
                    ("gte", &range.gte),
                    ("gt", &range.gt),
                    ("lte", &range.lte),
                    ("lt", &range.lt),
                ] {
                    if let Some(value) = bound {
                        bounds.insert(key.to_string(), value.clone());
                    }
                }
                json!({"range": {range.field.clone(): bounds}})
            }
            Query::Bool(bool_query) => {
                let mut body = Map::new();
                for (key, clauses) in [
                    ("must", &bool_query.must),
                    ("filter", &bool_query.filter),
                    ("should", &bool_query.should),
                    ("must_not", &bool_query.must_not),
                ] {
                    if !clauses.is_empty() {
                        body.insert(
                            key.to_string(),
                            Value::Array(clauses.iter().map(Query::to_json).collect()),
                        );
                    }
                }
                json!({"bool": body})
            }
            Query::Nested {
                path,
                score_mode,
                query,
            } => json!({"nested": {
                "path": path,
                "score_mode": score_mode.as_str(),
                "query": query.to_json(),
            }}),
        }
    }
}

impl From<BoolQuery> for Query {
    fn from(query: BoolQuery) -> Self {
        Query::Bool(query)
    }
}

impl From<RangeQuery> for Query {
    fn from(query: RangeQuery) -> Self {
        Query::Range(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_omits_empty_clauses() {
        let query: Query = BoolQuery::new()
            .must(Query::matching("name", "anton"))
            .filter(Query::term("city", "Berlin"))
            .into();

        assert_eq!(
            query.to_json(),
            json!({"bool": {
                "must": [{"match": {"name": "anton"}}],
                "filter": [{"term": {"city": "Berlin"}}]
            }})
        );
    }

    #[test]
    fn nested_range_renders() {
        let query = Query::nested(
            "offsets",
            ScoreMode::None,
            RangeQuery::new("offsets.begin").gte(3).lte(9).into(),
        );

        assert_eq!(
            query.to_json(),
            json!({"nested": {
                "path": "offsets",
                "score_mode": "none",
                "query": {"range": {"offsets.begin": {"gte": 3, "lte": 9}}}
            }})
        );
    }

    #[test]
    fn ids_and_terms_render() {
        assert_eq!(
            Query::ids(["a", "b"]).to_json(),
            json!({"ids": {"values": ["a", "b"]}})
        );
        assert_eq!(
            Query::terms("age", vec![json!(1), json!(2)]).to_json(),
            json!({"terms": {"age": [1, 2]}})
        );
    }
}
