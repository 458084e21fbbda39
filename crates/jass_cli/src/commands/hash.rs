//! Schema hashes.

use super::{compiler, read_schema, CliError};
use jass_core::schema::{hash_mapping, hash_schema_identity, SchemaCompiler};
use std::path::Path;

/// Renders the identity hash and the compiled mapping hash of `raw`.
pub fn render(compiler: &SchemaCompiler, raw: &str, nested: &[String]) -> Result<String, CliError> {
    let mapping = compiler.compile_str(raw, nested)?;
    Ok(format!(
        "jsonSchemaHash: {}\nesHash: {}",
        hash_schema_identity(raw),
        hash_mapping(&mapping)?
    ))
}

/// Hashes the schema at `path`.
pub fn run(path: &Path, nested: &[String]) -> Result<String, CliError> {
    render(&compiler()?, &read_schema(path)?, nested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_changes_only_the_identity() {
        let compiler = SchemaCompiler::default();
        let a = render(&compiler, r#"{"a":{"type":"long"},"b":{"type":"boolean"}}"#, &[]).unwrap();
        let b = render(&compiler, r#"{"b":{"type":"boolean"},"a":{"type":"long"}}"#, &[]).unwrap();
        let (a_identity, a_mapping) = a.split_once('\n').unwrap();
        let (b_identity, b_mapping) = b.split_once('\n').unwrap();
        assert_ne!(a_identity, b_identity);
        assert_eq!(a_mapping, b_mapping);
    }
}
