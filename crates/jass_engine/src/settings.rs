//! Index creation settings.

use crate::analysis::AnalysisSettings;
use crate::mapping::EngineMapping;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default cap on `from + size` for a bounded search.
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

/// Settings keys the engine assigns itself at creation time.
///
/// They are reported by `get_settings` but rejected by `create_index`.
pub const CREATION_ONLY_SETTINGS: [&str; 4] = ["creation_date", "provided_name", "uuid", "version"];

/// Settings of a single index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Primary shard count.
    pub number_of_shards: u32,

    /// Replica count per primary shard.
    pub number_of_replicas: u32,

    /// Cap on `from + size` for bounded searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_result_window: Option<usize>,

    /// Custom analysis chain definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisSettings>,

    /// Any other keys, including the creation-time-only ones.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 0,
            max_result_window: None,
            analysis: None,
            extra: Map::new(),
        }
    }
}

impl IndexSettings {
    /// Creates settings with the given shard and replica counts.
    #[must_use]
    pub fn new(number_of_shards: u32, number_of_replicas: u32) -> Self {
        Self {
            number_of_shards,
            number_of_replicas,
            ..Self::default()
        }
    }

    /// Sets the result window.
    #[must_use]
    pub fn with_max_result_window(mut self, window: usize) -> Self {
        self.max_result_window = Some(window);
        self
    }

    /// Sets the analysis chain.
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalysisSettings) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Effective result window.
    #[must_use]
    pub fn result_window(&self) -> usize {
        self.max_result_window.unwrap_or(DEFAULT_MAX_RESULT_WINDOW)
    }

    /// Removes the keys the engine assigns at creation time.
    ///
    /// Settings read back from a live index must pass through this before
    /// they can be used to create another index.
    #[must_use]
    pub fn without_creation_only(mut self) -> Self {
        for key in CREATION_ONLY_SETTINGS {
            self.extra.remove(key);
        }
        self
    }

    /// Returns the first creation-time-only key present, if any.
    #[must_use]
    pub fn creation_only_key(&self) -> Option<&'static str> {
        CREATION_ONLY_SETTINGS
            .into_iter()
            .find(|key| self.extra.contains_key(*key))
    }
}

/// Body of a create-index request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexBody {
    /// Index settings.
    pub settings: IndexSettings,

    /// Initial mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<EngineMapping>,
}

impl IndexBody {
    /// Creates a body from settings alone.
    #[must_use]
    pub fn new(settings: IndexSettings) -> Self {
        Self {
            settings,
            mappings: None,
        }
    }

    /// Sets the initial mapping.
    #[must_use]
    pub fn with_mappings(mut self, mappings: EngineMapping) -> Self {
        self.mappings = Some(mappings);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extra_keys_round_through_flatten() {
        let settings: IndexSettings = serde_json::from_value(json!({
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "creation_date": "1500000000000",
            "uuid": "abc",
            "refresh_interval": "1s"
        }))
        .unwrap();

        assert_eq!(settings.creation_only_key(), Some("creation_date"));
        let cleaned = settings.without_creation_only();
        assert_eq!(cleaned.creation_only_key(), None);
        assert_eq!(cleaned.extra.get("refresh_interval"), Some(&json!("1s")));
    }

    #[test]
    fn default_result_window() {
        assert_eq!(IndexSettings::default().result_window(), 10_000);
        assert_eq!(
            IndexSettings::default()
                .with_max_result_window(500_000)
                .result_window(),
            500_000
        );
    }
}
