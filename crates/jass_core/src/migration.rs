//! Additive migration between compiled mappings.
//!
//! A field, once mapped, keeps its definition forever. Moving from one
//! mapping to another may only introduce fields.

use crate::error::{CoreError, CoreResult};
use jass_engine::EngineMapping;

/// Checks that `to` keeps every field of `from` unchanged.
///
/// Redefinitions are reported before deletions.
///
/// # Errors
///
/// `MigrationIncompatible` naming the first redefined field, otherwise
/// `MigrationDeleteNotSupported` naming the first missing one.
pub fn can_migrate(from: &EngineMapping, to: &EngineMapping) -> CoreResult<()> {
    for (name, definition) in &from.properties {
        if to.properties.get(name).is_some_and(|target| target != definition) {
            return Err(CoreError::MigrationIncompatible {
                field: name.clone(),
            });
        }
    }
    if let Some(name) = from.properties.keys().find(|name| !to.properties.contains_key(*name)) {
        return Err(CoreError::MigrationDeleteNotSupported {
            field: name.clone(),
        });
    }
    Ok(())
}

/// Returns the fields of `to` that `from` lacks.
///
/// # Errors
///
/// Whatever [`can_migrate`] reports.
pub fn compute_delta(from: &EngineMapping, to: &EngineMapping) -> CoreResult<EngineMapping> {
    can_migrate(from, to)?;
    Ok(EngineMapping {
        dynamic: None,
        properties: to
            .properties
            .iter()
            .filter(|(name, _)| !from.properties.contains_key(*name))
            .map(|(name, definition)| (name.clone(), definition.clone()))
            .collect(),
    })
}
