//! Additive migration checks between two schemas.

use super::{compiler, read_schema, CliError};
use jass_core::migration::compute_delta;
use jass_core::schema::SchemaCompiler;
use std::path::Path;
use tracing::info;

/// Compiles both schemas and renders the fields `to` adds over `from`.
///
/// Redefined or removed fields fail with the migration error.
pub fn render(
    compiler: &SchemaCompiler,
    from: &str,
    to: &str,
    nested: &[String],
) -> Result<String, CliError> {
    let from = compiler.compile_str(from, nested)?;
    let to = compiler.compile_str(to, nested)?;
    let delta = compute_delta(&from, &to)?;
    info!(added = delta.properties.len(), "migration is additive");
    Ok(serde_json::to_string_pretty(&delta)?)
}

/// Checks the migration between the schema files `from` and `to`.
pub fn run(from: &Path, to: &Path, nested: &[String]) -> Result<String, CliError> {
    render(&compiler()?, &read_schema(from)?, &read_schema(to)?, nested)
}
