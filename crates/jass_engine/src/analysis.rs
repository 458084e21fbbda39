//! Analysis chains.
//!
//! [`AnalysisSettings`] is the declarative form stored in index settings.
//! [`Analyzer`] is its runtime form: a tokenizer followed by token filters,
//! resolved by name against the built-in analyzers and an index's custom
//! definitions.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Natural-language analyzers the engine ships with.
pub const LANGUAGE_ANALYZERS: [&str; 33] = [
    "arabic", "armenian", "basque", "brazilian", "bulgarian", "catalan", "cjk", "czech",
    "danish", "dutch", "english", "finnish", "french", "galician", "german", "greek", "hindi",
    "hungarian", "indonesian", "irish", "italian", "latvian", "lithuanian", "norwegian",
    "persian", "portuguese", "romanian", "russian", "sorani", "spanish", "swedish", "turkish",
    "thai",
];

/// Custom analysis definitions of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Named analyzers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub analyzer: BTreeMap<String, AnalyzerDef>,

    /// Named tokenizers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tokenizer: BTreeMap<String, TokenizerDef>,

    /// Named token filters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filter: BTreeMap<String, TokenFilterDef>,
}

impl AnalysisSettings {
    /// Creates empty analysis settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, name: impl Into<String>, def: AnalyzerDef) -> Self {
        self.analyzer.insert(name.into(), def);
        self
    }

    /// Adds a tokenizer.
    #[must_use]
    pub fn with_tokenizer(mut self, name: impl Into<String>, def: TokenizerDef) -> Self {
        self.tokenizer.insert(name.into(), def);
        self
    }

    /// Adds a token filter.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, def: TokenFilterDef) -> Self {
        self.filter.insert(name.into(), def);
        self
    }

    /// Checks that every analyzer refers to a known tokenizer and filters.
    pub fn validate(&self) -> EngineResult<()> {
        for name in self.analyzer.keys() {
            Analyzer::resolve(name, Some(self))?;
        }
        Ok(())
    }
}

/// A custom analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerDef {
    /// Analyzer kind, normally `custom`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Tokenizer name.
    pub tokenizer: String,

    /// Filter names, applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<String>,
}

impl AnalyzerDef {
    /// Creates an analyzer around a tokenizer.
    #[must_use]
    pub fn new(tokenizer: impl Into<String>) -> Self {
        Self {
            kind: None,
            tokenizer: tokenizer.into(),
            filter: Vec::new(),
        }
    }

    /// Marks the analyzer as `custom`.
    #[must_use]
    pub fn custom(mut self) -> Self {
        self.kind = Some("custom".to_string());
        self
    }

    /// Appends a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter.push(filter.into());
        self
    }
}

/// Character classes kept by n-gram tokenizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenChars {
    /// Alphabetic characters.
    Letter,
    /// Numeric characters.
    Digit,
    /// Whitespace.
    Whitespace,
    /// Punctuation.
    Punctuation,
    /// Other symbols.
    Symbol,
}

impl TokenChars {
    fn accepts(self, c: char) -> bool {
        match self {
            TokenChars::Letter => c.is_alphabetic(),
            TokenChars::Digit => c.is_numeric(),
            TokenChars::Whitespace => c.is_whitespace(),
            TokenChars::Punctuation => c.is_ascii_punctuation(),
            TokenChars::Symbol => !c.is_alphanumeric() && !c.is_whitespace(),
        }
    }
}

/// A custom tokenizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenizerDef {
    /// Prefixes of each run of kept characters.
    #[serde(rename = "edge_ngram", alias = "edgeNGram")]
    EdgeNgram {
        /// Shortest gram.
        min_gram: usize,
        /// Longest gram.
        max_gram: usize,
        /// Characters kept inside a token; empty keeps everything.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        token_chars: Vec<TokenChars>,
    },
    /// Every substring of each run of kept characters.
    #[serde(rename = "ngram", alias = "nGram")]
    Ngram {
        /// Shortest gram.
        min_gram: usize,
        /// Longest gram.
        max_gram: usize,
        /// Characters kept inside a token; empty keeps everything.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        token_chars: Vec<TokenChars>,
    },
    /// Every ancestor of a delimited path.
    #[serde(rename = "path_hierarchy")]
    PathHierarchy {
        /// Path separator.
        #[serde(default = "default_delimiter")]
        delimiter: char,
        /// Leading components to drop.
        #[serde(default)]
        skip: usize,
    },
}

fn default_delimiter() -> char {
    '/'
}

/// A custom token filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenFilterDef {
    /// Every substring of each token.
    #[serde(rename = "nGram", alias = "ngram")]
    Ngram {
        /// Shortest gram.
        min_gram: usize,
        /// Longest gram.
        max_gram: usize,
    },
    /// Prefixes of each token.
    #[serde(rename = "edge_ngram", alias = "edgeNGram")]
    EdgeNgram {
        /// Shortest gram.
        min_gram: usize,
        /// Longest gram.
        max_gram: usize,
    },
    /// Lowercases each token.
    #[serde(rename = "lowercase")]
    Lowercase,
}

#[derive(Debug, Clone, PartialEq)]
enum Tokenizer {
    Standard,
    Keyword,
    Lowercase,
    Whitespace,
    EdgeNgram {
        min: usize,
        max: usize,
        chars: Vec<TokenChars>,
    },
    Ngram {
        min: usize,
        max: usize,
        chars: Vec<TokenChars>,
    },
    PathHierarchy {
        delimiter: char,
        skip: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Lowercase,
    Ngram { min: usize, max: usize },
    EdgeNgram { min: usize, max: usize },
}

/// A resolved analysis chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Analyzer {
    tokenizer: Tokenizer,
    filters: Vec<Filter>,
}

impl Analyzer {
    /// The standard analyzer: word tokens, lowercased.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            tokenizer: Tokenizer::Standard,
            filters: vec![Filter::Lowercase],
        }
    }

    /// The keyword analyzer: the whole value as one token.
    #[must_use]
    pub fn keyword() -> Self {
        Self {
            tokenizer: Tokenizer::Keyword,
            filters: Vec::new(),
        }
    }

    /// Resolves an analyzer by name.
    ///
    /// Custom definitions shadow built-ins. Language analyzers behave like
    /// the standard analyzer.
    pub fn resolve(name: &str, analysis: Option<&AnalysisSettings>) -> EngineResult<Self> {
        if let Some(def) = analysis.and_then(|a| a.analyzer.get(name)) {
            let tokenizer = resolve_tokenizer(&def.tokenizer, analysis)?;
            let filters = def
                .filter
                .iter()
                .map(|f| resolve_filter(f, analysis))
                .collect::<EngineResult<Vec<_>>>()?;
            return Ok(Self { tokenizer, filters });
        }
        match name {
            "standard" => Ok(Self::standard()),
            "keyword" => Ok(Self::keyword()),
            "simple" => Ok(Self {
                tokenizer: Tokenizer::Lowercase,
                filters: Vec::new(),
            }),
            "whitespace" => Ok(Self {
                tokenizer: Tokenizer::Whitespace,
                filters: Vec::new(),
            }),
            _ if LANGUAGE_ANALYZERS.contains(&name) => Ok(Self::standard()),
            _ => Err(EngineError::illegal_argument(format!(
                "analyzer [{name}] not found"
            ))),
        }
    }

    /// Splits text into the tokens this chain produces.
    #[must_use]
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let mut tokens = self.tokenizer.tokenize(text);
        for filter in &self.filters {
            tokens = filter.apply(tokens);
        }
        tokens
    }
}

fn resolve_tokenizer(name: &str, analysis: Option<&AnalysisSettings>) -> EngineResult<Tokenizer> {
    if let Some(def) = analysis.and_then(|a| a.tokenizer.get(name)) {
        return Ok(match def {
            TokenizerDef::EdgeNgram {
                min_gram,
                max_gram,
                token_chars,
            } => Tokenizer::EdgeNgram {
                min: *min_gram,
                max: *max_gram,
                chars: token_chars.clone(),
            },
            TokenizerDef::Ngram {
                min_gram,
                max_gram,
                token_chars,
            } => Tokenizer::Ngram {
                min: *min_gram,
                max: *max_gram,
                chars: token_chars.clone(),
            },
            TokenizerDef::PathHierarchy { delimiter, skip } => Tokenizer::PathHierarchy {
                delimiter: *delimiter,
                skip: *skip,
            },
        });
    }
    match name {
        "standard" => Ok(Tokenizer::Standard),
        "keyword" => Ok(Tokenizer::Keyword),
        "lowercase" => Ok(Tokenizer::Lowercase),
        "whitespace" => Ok(Tokenizer::Whitespace),
        "path_hierarchy" => Ok(Tokenizer::PathHierarchy {
            delimiter: '/',
            skip: 0,
        }),
        _ => Err(EngineError::illegal_argument(format!(
            "tokenizer [{name}] not found"
        ))),
    }
}

fn resolve_filter(name: &str, analysis: Option<&AnalysisSettings>) -> EngineResult<Filter> {
    if let Some(def) = analysis.and_then(|a| a.filter.get(name)) {
        return Ok(match def {
            TokenFilterDef::Ngram { min_gram, max_gram } => Filter::Ngram {
                min: *min_gram,
                max: *max_gram,
            },
            TokenFilterDef::EdgeNgram { min_gram, max_gram } => Filter::EdgeNgram {
                min: *min_gram,
                max: *max_gram,
            },
            TokenFilterDef::Lowercase => Filter::Lowercase,
        });
    }
    match name {
        "lowercase" => Ok(Filter::Lowercase),
        _ => Err(EngineError::illegal_argument(format!(
            "token filter [{name}] not found"
        ))),
    }
}

impl Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        match self {
            Tokenizer::Standard => runs(text, |c| c.is_alphanumeric()),
            Tokenizer::Keyword => vec![text.to_string()],
            Tokenizer::Lowercase => runs(text, char::is_alphabetic)
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            Tokenizer::Whitespace => text.split_whitespace().map(str::to_string).collect(),
            Tokenizer::EdgeNgram { min, max, chars } => kept_runs(text, chars)
                .iter()
                .flat_map(|run| edge_grams(run, *min, *max))
                .collect(),
            Tokenizer::Ngram { min, max, chars } => kept_runs(text, chars)
                .iter()
                .flat_map(|run| grams(run, *min, *max))
                .collect(),
            Tokenizer::PathHierarchy { delimiter, skip } => path_prefixes(text, *delimiter, *skip),
        }
    }
}

impl Filter {
    fn apply(&self, tokens: Vec<String>) -> Vec<String> {
        match self {
            Filter::Lowercase => tokens.into_iter().map(|t| t.to_lowercase()).collect(),
            Filter::Ngram { min, max } => tokens.iter().flat_map(|t| grams(t, *min, *max)).collect(),
            Filter::EdgeNgram { min, max } => tokens
                .iter()
                .flat_map(|t| edge_grams(t, *min, *max))
                .collect(),
        }
    }
}

fn runs(text: &str, keep: impl Fn(char) -> bool) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if keep(c) {
            current.push(c);
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn kept_runs(text: &str, chars: &[TokenChars]) -> Vec<String> {
    if chars.is_empty() {
        return vec![text.to_string()];
    }
    runs(text, |c| chars.iter().any(|class| class.accepts(c)))
}

fn edge_grams(token: &str, min: usize, max: usize) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    (min.max(1)..=max.min(chars.len()))
        .map(|len| chars[..len].iter().collect())
        .collect()
}

fn grams(token: &str, min: usize, max: usize) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    let mut out = Vec::new();
    for start in 0..chars.len() {
        for len in min.max(1)..=max {
            if start + len > chars.len() {
                break;
            }
            out.push(chars[start..start + len].iter().collect());
        }
    }
    out
}

fn path_prefixes(text: &str, delimiter: char, skip: usize) -> Vec<String> {
    let rooted = text.starts_with(delimiter);
    let parts: Vec<&str> = text.split(delimiter).filter(|p| !p.is_empty()).collect();
    let mut out = Vec::new();
    let mut acc = String::new();
    for (i, part) in parts.iter().skip(skip).enumerate() {
        if i > 0 || rooted || skip > 0 {
            acc.push(delimiter);
        }
        acc.push_str(part);
        out.push(acc.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> AnalysisSettings {
        serde_json::from_value(json!({
            "filter": {"ngram_filter": {"type": "nGram", "min_gram": 2, "max_gram": 3}},
            "tokenizer": {
                "path_tokenizer": {"type": "path_hierarchy", "delimiter": "/", "skip": 0},
                "autocomplete": {
                    "type": "edge_ngram", "min_gram": 2, "max_gram": 10,
                    "token_chars": ["letter", "digit"]
                }
            },
            "analyzer": {
                "ngram_filter_analyzer": {
                    "type": "custom", "tokenizer": "standard",
                    "filter": ["lowercase", "ngram_filter"]
                },
                "autocomplete": {"tokenizer": "autocomplete", "filter": ["lowercase"]},
                "autocomplete_search": {"tokenizer": "lowercase"},
                "path_analyzer": {"tokenizer": "path_tokenizer"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn standard_splits_and_lowercases() {
        let tokens = Analyzer::standard().analyze("Hello, World-42!");
        assert_eq!(tokens, vec!["hello", "world", "42"]);
    }

    #[test]
    fn keyword_keeps_whole_value() {
        assert_eq!(Analyzer::keyword().analyze("New York"), vec!["New York"]);
    }

    #[test]
    fn autocomplete_emits_prefixes() {
        let analysis = sample();
        let analyzer = Analyzer::resolve("autocomplete", Some(&analysis)).unwrap();
        assert_eq!(analyzer.analyze("Berl"), vec!["be", "ber", "berl"]);

        let search = Analyzer::resolve("autocomplete_search", Some(&analysis)).unwrap();
        assert_eq!(search.analyze("BER"), vec!["ber"]);
    }

    #[test]
    fn ngram_filter_emits_substrings() {
        let analysis = sample();
        let analyzer = Analyzer::resolve("ngram_filter_analyzer", Some(&analysis)).unwrap();
        assert_eq!(analyzer.analyze("Abcd"), vec!["ab", "abc", "bc", "bcd", "cd"]);
    }

    #[test]
    fn path_analyzer_emits_ancestors() {
        let analysis = sample();
        let analyzer = Analyzer::resolve("path_analyzer", Some(&analysis)).unwrap();
        assert_eq!(
            analyzer.analyze("/usr/local/bin"),
            vec!["/usr", "/usr/local", "/usr/local/bin"]
        );
        assert_eq!(analyzer.analyze("a/b"), vec!["a", "a/b"]);
    }

    #[test]
    fn language_analyzers_resolve() {
        assert_eq!(
            Analyzer::resolve("french", None).unwrap(),
            Analyzer::standard()
        );
    }

    #[test]
    fn unknown_analyzer_is_rejected() {
        assert!(matches!(
            Analyzer::resolve("klingon", None),
            Err(EngineError::IllegalArgument(_))
        ));
    }

    #[test]
    fn validate_catches_dangling_references() {
        let analysis =
            AnalysisSettings::new().with_analyzer("broken", AnalyzerDef::new("nope"));
        assert!(analysis.validate().is_err());
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn serializes_filter_type_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["filter"]["ngram_filter"]["type"], json!("nGram"));
        assert_eq!(value["tokenizer"]["autocomplete"]["type"], json!("edge_ngram"));
    }
}
