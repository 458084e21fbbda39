//! Layer configuration.

use crate::connection::ReconnectPolicy;
use crate::error::{CoreError, CoreResult};
use std::time::Duration;

/// Naming of document-directory indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySettings {
    /// Marks indices owned by document directories.
    pub class_prefix: String,
    /// Suffix of data indices.
    pub data_suffix: String,
    /// Suffix of type-binding indices.
    pub type_suffix: String,
    /// Suffix of the default type's data index.
    pub default_type_suffix: String,
    /// Type of documents written without one.
    pub default_type: String,
    /// Suffix of the tenant's directory registry.
    pub registry_suffix: String,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            class_prefix: "_dd_".to_string(),
            data_suffix: "_data".to_string(),
            type_suffix: "_type".to_string(),
            default_type_suffix: "_0".to_string(),
            default_type: "default".to_string(),
            registry_suffix: "document_directory_listing".to_string(),
        }
    }
}

/// Naming of schema registry indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSettings {
    /// Marks indices owned by the schema registry.
    pub class_prefix: String,
    /// Suffix of the raw schema index.
    pub json_schemas_suffix: String,
    /// Suffix of the compiled mapping index.
    pub es_schemas_suffix: String,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            class_prefix: "_schema_list_".to_string(),
            json_schemas_suffix: "json_schemas".to_string(),
            es_schemas_suffix: "es_schemas".to_string(),
        }
    }
}

/// Settings applied to every index this layer creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDefaults {
    /// Primary shard count.
    pub number_of_shards: u32,
    /// Replica count.
    pub number_of_replicas: u32,
    /// Result window of data indices.
    pub data_max_result_window: usize,
}

impl Default for IndexDefaults {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 0,
            data_max_result_window: 500_000,
        }
    }
}

/// Cursor traversal parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    /// How long an idle cursor stays alive.
    pub keep_alive: Duration,
    /// Hits fetched per page.
    pub page_size: usize,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(15 * 60),
            page_size: 1000,
        }
    }
}

/// Configuration of the document layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Tenant the process serves by default.
    pub tenant_id: String,
    /// Directory index naming.
    pub directory: DirectorySettings,
    /// Schema registry naming.
    pub schema: SchemaSettings,
    /// Index creation defaults.
    pub index: IndexDefaults,
    /// Cursor traversal.
    pub scroll: ScrollSettings,
    /// How long to wait for the cluster to become ready.
    pub cluster_health_timeout: Duration,
    /// Engine reconnect schedule.
    pub reconnect: ReconnectPolicy,
    /// Language tag to analyzer table; keys may end with `*`.
    pub languages: Vec<(String, String)>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tenant_id: "jassdev".to_string(),
            directory: DirectorySettings::default(),
            schema: SchemaSettings::default(),
            index: IndexDefaults::default(),
            scroll: ScrollSettings::default(),
            cluster_health_timeout: Duration::from_secs(60),
            reconnect: ReconnectPolicy::default(),
            languages: [
                ("en", "english"),
                ("fr", "french"),
                ("en-*", "english"),
                ("fr-*", "french"),
                ("english", "english"),
                ("french", "french"),
            ]
            .into_iter()
            .map(|(tag, analyzer)| (tag.to_string(), analyzer.to_string()))
            .collect(),
        }
    }
}

impl Settings {
    /// Creates settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for values that do not parse.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`; unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for values that do not parse.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(env) = lookup("JASS_ENV") {
            settings.tenant_id = env;
        }
        if let Some(v) = lookup("NUMBER_OF_SHARDS") {
            settings.index.number_of_shards = parse_number("NUMBER_OF_SHARDS", &v)?;
        }
        if let Some(v) = lookup("NUMBER_OF_REPLICAS") {
            settings.index.number_of_replicas = parse_number("NUMBER_OF_REPLICAS", &v)?;
        }
        if let Some(v) = lookup("SCAN_SCROLL_DURATION") {
            settings.scroll.keep_alive = parse_duration("SCAN_SCROLL_DURATION", &v)?;
        }
        if let Some(v) = lookup("NB_DOCUMENTS_PER_SCAN_SCROLL") {
            settings.scroll.page_size = parse_number("NB_DOCUMENTS_PER_SCAN_SCROLL", &v)?;
        }
        if let Some(v) = lookup("CLUSTER_HEALTH_TIMEOUT") {
            settings.cluster_health_timeout = parse_duration("CLUSTER_HEALTH_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("ES_RECONNECT_ATTEMPTS") {
            settings.reconnect.max_attempts = parse_number("ES_RECONNECT_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("ES_RECONNECT_BACKOFF") {
            let backoff = parse_duration("ES_RECONNECT_BACKOFF", &v)?;
            settings.reconnect = ReconnectPolicy::fixed(settings.reconnect.max_attempts, backoff);
        }
        Ok(settings)
    }

    /// Sets the tenant id.
    #[must_use]
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Sets shard and replica counts.
    #[must_use]
    pub const fn shards(mut self, number_of_shards: u32, number_of_replicas: u32) -> Self {
        self.index.number_of_shards = number_of_shards;
        self.index.number_of_replicas = number_of_replicas;
        self
    }

    /// Sets cursor keep-alive and page size.
    #[must_use]
    pub const fn scroll(mut self, keep_alive: Duration, page_size: usize) -> Self {
        self.scroll.keep_alive = keep_alive;
        self.scroll.page_size = page_size;
        self
    }

    /// Sets the cluster health timeout.
    #[must_use]
    pub const fn cluster_health_timeout(mut self, timeout: Duration) -> Self {
        self.cluster_health_timeout = timeout;
        self
    }

    /// Sets the reconnect policy.
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Adds or replaces a language mapping.
    #[must_use]
    pub fn language(mut self, tag: impl Into<String>, analyzer: impl Into<String>) -> Self {
        let tag = tag.into();
        let analyzer = analyzer.into();
        match self.languages.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 = analyzer,
            None => self.languages.push((tag, analyzer)),
        }
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| CoreError::invalid_config(key, format!("{value:?}: {e}")))
}

/// Parses durations written as `500ms`, `30s`, `15m`, `1h` or `2d`. A bare
/// number is seconds.
pub fn parse_duration(key: &str, value: &str) -> CoreResult<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits
        .parse()
        .map_err(|_| CoreError::invalid_config(key, format!("{value:?} is not a duration")))?;
    let seconds_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(amount)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        other => {
            return Err(CoreError::invalid_config(
                key,
                format!("unknown duration unit {other:?}"),
            ))
        }
    };
    amount
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| CoreError::invalid_config(key, format!("{value:?} is out of range")))
}
