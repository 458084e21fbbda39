//! CLI command implementations.

pub mod check_name;
pub mod compile;
pub mod hash;
pub mod migrate;

use jass_core::schema::SchemaCompiler;
use jass_core::{CoreError, LanguageManager, Settings};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The document layer rejected the input.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Output could not be rendered.
    #[error("cannot render output: {0}")]
    Render(#[from] serde_json::Error),
}

/// Reads a schema file as text.
pub fn read_schema(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Compiler configured from the environment's language table.
pub fn compiler() -> Result<SchemaCompiler, CliError> {
    let settings = Settings::from_env()?;
    Ok(SchemaCompiler::new(LanguageManager::from_settings(&settings)))
}
