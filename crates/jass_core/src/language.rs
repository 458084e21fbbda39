//! Language tag to analyzer resolution.

use crate::config::Settings;
use jass_engine::glob_match;
use std::collections::HashMap;

/// Resolves language tags such as `en` or `fr-CA` to engine analyzers.
///
/// Exact tags are consulted first, then wildcard patterns (`en-*`) in the
/// order they were registered.
#[derive(Debug, Clone, Default)]
pub struct LanguageManager {
    exact: HashMap<String, String>,
    patterns: Vec<(String, String)>,
}

impl LanguageManager {
    /// Builds a manager from `(tag, analyzer)` pairs.
    pub fn new<I, T, A>(table: I) -> Self
    where
        I: IntoIterator<Item = (T, A)>,
        T: Into<String>,
        A: Into<String>,
    {
        let mut manager = Self::default();
        for (tag, analyzer) in table {
            let tag = tag.into();
            let analyzer = analyzer.into();
            if tag.contains('*') {
                manager.patterns.push((tag, analyzer));
            } else {
                manager.exact.insert(tag, analyzer);
            }
        }
        manager
    }

    /// Builds a manager from the configured language table.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.languages.iter().cloned())
    }

    /// Returns true if `language` resolves to an analyzer.
    #[must_use]
    pub fn has_analyzer(&self, language: &str) -> bool {
        self.analyzer_for(language).is_some()
    }

    /// Returns the analyzer for `language`, if any.
    #[must_use]
    pub fn analyzer_for(&self, language: &str) -> Option<&str> {
        if let Some(analyzer) = self.exact.get(language) {
            return Some(analyzer);
        }
        self.patterns
            .iter()
            .find(|(pattern, _)| glob_match(pattern, language))
            .map(|(_, analyzer)| analyzer.as_str())
    }
}
