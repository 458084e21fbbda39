//! Document directories.
//!
//! A directory groups documents by type. Each type is bound to one
//! physical data index through the directory's type index; the tenant's
//! directory registry lists every directory.
//!
//! Physical names for tenant `t` and directory `d` with default settings:
//!
//! | index            | name             |
//! |------------------|------------------|
//! | registry         | `t_dd_document_directory_listing` |
//! | type bindings    | `t_dd_d_type`    |
//! | default type     | `t_dd_d_data_0`  |
//! | any other type   | `t_dd_d_data_<uuid>` |

mod document;
mod registry;

pub use document::{BulkOutcome, DocumentDirectory, SearchParams, WriteOptions};
pub use registry::DirectoryRegistry;

use crate::config::Settings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directory as listed in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Directory id, unique per tenant.
    pub id: String,
    /// Optional alias, unique per tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Physical index names of one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNames {
    /// Index holding the type bindings.
    pub type_index: String,
    /// Common prefix of every data index.
    pub data_prefix: String,
    /// Data index of the default type.
    pub default_data_index: String,
}

impl DirectoryNames {
    /// Derives the names of directory `id`.
    #[must_use]
    pub fn new(settings: &Settings, id: &str) -> Self {
        let dir = &settings.directory;
        let base = format!("{}{}{id}", settings.tenant_id, dir.class_prefix);
        let data_prefix = format!("{base}{}", dir.data_suffix);
        Self {
            type_index: format!("{base}{}", dir.type_suffix),
            default_data_index: format!("{data_prefix}{}", dir.default_type_suffix),
            data_prefix,
        }
    }

    /// A fresh data index name for a non-default type.
    #[must_use]
    pub fn new_data_index(&self) -> String {
        format!("{}_{}", self.data_prefix, Uuid::new_v4().simple())
    }
}
