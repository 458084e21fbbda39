//! Index selectors: comma separated names and `*` patterns.

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Exact(String),
    Pattern(String),
}

/// A parsed index selector such as `a_data_0,a_data_*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPattern {
    parts: Vec<Part>,
}

impl IndexPattern {
    /// Parses a selector. Empty entries are rejected.
    pub fn parse(selector: &str) -> EngineResult<Self> {
        let mut parts = Vec::new();
        for entry in selector.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(EngineError::illegal_argument(format!(
                    "empty index name in selector [{selector}]"
                )));
            }
            if entry == "_all" {
                parts.push(Part::Pattern("*".to_string()));
            } else if entry.contains('*') {
                parts.push(Part::Pattern(entry.to_string()));
            } else {
                parts.push(Part::Exact(entry.to_string()));
            }
        }
        Ok(Self { parts })
    }

    /// Returns true if the selector names exactly one concrete index.
    #[must_use]
    pub fn is_single_concrete(&self) -> bool {
        matches!(self.parts.as_slice(), [Part::Exact(_)])
    }

    /// Resolves the selector against the existing index names.
    ///
    /// Concrete entries must exist; patterns may match nothing. The result
    /// is sorted and free of duplicates.
    pub fn resolve<'a, I>(&self, existing: I) -> EngineResult<Vec<String>>
    where
        I: IntoIterator<Item = &'a String> + Clone,
    {
        let mut out = Vec::new();
        for part in &self.parts {
            match part {
                Part::Exact(name) => {
                    if !existing.clone().into_iter().any(|n| n == name) {
                        return Err(EngineError::index_not_found(name.clone()));
                    }
                    out.push(name.clone());
                }
                Part::Pattern(pattern) => out.extend(
                    existing
                        .clone()
                        .into_iter()
                        .filter(|n| glob_match(pattern, n))
                        .cloned(),
                ),
            }
        }
        out.sort();
        out.dedup();
        Ok(out)
    }
}

/// Matches `name` against a pattern where `*` stands for any run of characters.
#[must_use]
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec![
            "t_dd_a_data_0".to_string(),
            "t_dd_a_data_x1".to_string(),
            "t_dd_a_type".to_string(),
            "t_dd_b_data_0".to_string(),
        ]
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("t_dd_a_data_*", "t_dd_a_data_0"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a*c*e", "abcde"));
        assert!(!glob_match("t_dd_a_data_*", "t_dd_a_type"));
        assert!(!glob_match("abc", "abcd"));
    }

    #[test]
    fn resolve_mixes_exact_and_patterns() {
        let names = names();
        let selected = IndexPattern::parse("t_dd_a_data_*,t_dd_b_data_0")
            .unwrap()
            .resolve(&names)
            .unwrap();
        assert_eq!(
            selected,
            vec!["t_dd_a_data_0", "t_dd_a_data_x1", "t_dd_b_data_0"]
        );
    }

    #[test]
    fn missing_concrete_index_fails() {
        let names = names();
        let err = IndexPattern::parse("t_dd_c_data_0")
            .unwrap()
            .resolve(&names)
            .unwrap_err();
        assert!(matches!(err, EngineError::IndexNotFound { .. }));
    }

    #[test]
    fn unmatched_pattern_is_empty() {
        let names = names();
        let selected = IndexPattern::parse("t_dd_z_*")
            .unwrap()
            .resolve(&names)
            .unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn empty_entries_are_rejected() {
        assert!(IndexPattern::parse("a,,b").is_err());
        assert!(IndexPattern::parse("").is_err());
    }
}
