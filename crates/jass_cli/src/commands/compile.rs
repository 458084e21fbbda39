//! Schema compilation.

use super::{compiler, read_schema, CliError};
use jass_core::schema::{hash_mapping, hash_schema_identity, SchemaCompiler};
use serde_json::json;
use std::path::Path;
use tracing::debug;

/// Compiles `raw` and renders the mapping with both hashes.
pub fn render(
    compiler: &SchemaCompiler,
    raw: &str,
    nested: &[String],
    pretty: bool,
) -> Result<String, CliError> {
    let mapping = compiler.compile_str(raw, nested)?;
    debug!(fields = mapping.properties.len(), "schema compiled");
    let output = json!({
        "jsonSchemaHash": hash_schema_identity(raw),
        "esHash": hash_mapping(&mapping)?,
        "mapping": mapping,
    });
    Ok(if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    })
}

/// Compiles the schema at `path`.
pub fn run(path: &Path, nested: &[String], pretty: bool) -> Result<String, CliError> {
    render(&compiler()?, &read_schema(path)?, nested, pretty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::Write;

    const SCHEMA: &str = r#"{"title":{"type":"string","searchable":true,"searchModes":["noop"]},
        "tags":{"type":"array","items":{"type":"object","properties":{"k":{"type":"string"}}}}}"#;

    #[test]
    fn renders_mapping_and_hashes() {
        let out = render(&SchemaCompiler::default(), SCHEMA, &["tags".to_string()], false).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["mapping"]["properties"]["tags"]["type"], "nested");
        assert_eq!(value["mapping"]["properties"]["title"]["index"], "not_analyzed");
        assert!(value["jsonSchemaHash"].as_str().unwrap().starts_with('h'));
        assert_eq!(value["esHash"].as_str().unwrap().len(), 40);
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"age":{"type":"integer"}}"#).unwrap();
        let out = run(file.path(), &[], true).unwrap();
        assert!(out.contains("\n"));
        assert!(out.contains("\"age\""));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = run(Path::new("/nonexistent/schema.json"), &[], false).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }

    #[test]
    fn invalid_schema_is_reported() {
        let err = render(&SchemaCompiler::default(), r#"{"x":{}}"#, &[], false).unwrap_err();
        assert!(matches!(
            err,
            CliError::Core(jass_core::CoreError::UnsupportedSchemaShape { .. })
        ));
    }
}
