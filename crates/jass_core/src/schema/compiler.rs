//! Schema to engine mapping compilation.

use crate::error::CoreResult;
use crate::language::LanguageManager;
use crate::schema::definition::{SchemaDefinition, SchemaFieldSpec, SearchBinding, SearchMode};
use jass_engine::{
    AnalysisSettings, AnalyzerDef, DynamicMode, EngineMapping, FieldMapping, FieldType,
    IndexOption, TokenChars, TokenFilterDef, TokenizerDef,
};
use serde_json::Value;

/// Analyzer behind the `edge` mode at index time.
pub const AUTOCOMPLETE_ANALYZER: &str = "autocomplete";
/// Analyzer behind the `edge` mode at search time.
pub const AUTOCOMPLETE_SEARCH_ANALYZER: &str = "autocomplete_search";
/// Analyzer behind the `ngram` mode.
pub const NGRAM_ANALYZER: &str = "ngram_filter_analyzer";
/// Analyzer behind the `path` mode.
pub const PATH_ANALYZER: &str = "path_analyzer";

/// Analysis chains every data index is created with, so that any compiled
/// mapping can be applied to it.
#[must_use]
pub fn search_mode_analysis() -> AnalysisSettings {
    AnalysisSettings::new()
        .with_filter(
            "ngram_filter",
            TokenFilterDef::Ngram {
                min_gram: 2,
                max_gram: 3,
            },
        )
        .with_tokenizer(
            "path_tokenizer",
            TokenizerDef::PathHierarchy {
                delimiter: '/',
                skip: 0,
            },
        )
        .with_tokenizer(
            "autocomplete",
            TokenizerDef::EdgeNgram {
                min_gram: 2,
                max_gram: 10,
                token_chars: vec![TokenChars::Letter, TokenChars::Digit],
            },
        )
        .with_analyzer(
            NGRAM_ANALYZER,
            AnalyzerDef::new("standard")
                .custom()
                .with_filter("lowercase")
                .with_filter("ngram_filter"),
        )
        .with_analyzer(
            AUTOCOMPLETE_ANALYZER,
            AnalyzerDef::new("autocomplete").with_filter("lowercase"),
        )
        .with_analyzer(AUTOCOMPLETE_SEARCH_ANALYZER, AnalyzerDef::new("lowercase"))
        .with_analyzer(PATH_ANALYZER, AnalyzerDef::new("path_tokenizer"))
}

/// Turns schema definitions into engine mappings.
#[derive(Debug, Clone, Default)]
pub struct SchemaCompiler {
    languages: LanguageManager,
}

impl SchemaCompiler {
    /// Creates a compiler resolving `language` attributes through `languages`.
    pub fn new(languages: LanguageManager) -> Self {
        Self { languages }
    }

    /// Compiles raw schema text.
    ///
    /// # Errors
    ///
    /// Any parse error of [`SchemaDefinition::parse`].
    pub fn compile_str(&self, raw: &str, nested: &[String]) -> CoreResult<EngineMapping> {
        Ok(self.compile(&SchemaDefinition::parse(raw, nested)?))
    }

    /// Compiles a decoded schema.
    ///
    /// # Errors
    ///
    /// Any parse error of [`SchemaDefinition::from_value`].
    pub fn compile_value(&self, schema: &Value, nested: &[String]) -> CoreResult<EngineMapping> {
        Ok(self.compile(&SchemaDefinition::from_value(schema, nested)?))
    }

    /// Compiles a validated schema.
    #[must_use]
    pub fn compile(&self, schema: &SchemaDefinition) -> EngineMapping {
        schema
            .fields()
            .fold(EngineMapping::new(), |mapping, (name, spec)| {
                mapping.with_field(name, self.field(spec))
            })
    }

    fn field(&self, spec: &SchemaFieldSpec) -> FieldMapping {
        match spec {
            SchemaFieldSpec::NestedObjectArray { properties } => FieldMapping::nested(
                properties
                    .iter()
                    .map(|(name, json_type)| (name.clone(), FieldMapping::of(json_type.engine_type())))
                    .collect(),
            )
            .with_dynamic(DynamicMode::Strict),
            SchemaFieldSpec::ArrayOfScalar { item_type } => FieldMapping::of(item_type.engine_type()),
            SchemaFieldSpec::Scalar {
                json_type,
                binding: SearchBinding::Stored,
            } => FieldMapping::of(json_type.engine_type()).with_index(IndexOption::No),
            SchemaFieldSpec::Scalar {
                json_type,
                binding: SearchBinding::Indexed { modes, language },
            } => {
                let field_type = json_type.engine_type();
                let language = language.as_deref();
                let (base, rest) = match modes.split_first() {
                    Some(split) => split,
                    None => return FieldMapping::of(field_type),
                };
                rest.iter().fold(
                    self.mode_mapping(*base, field_type, language),
                    |mapping, mode| {
                        mapping.with_field(
                            mode.as_str(),
                            self.mode_mapping(*mode, field_type, language),
                        )
                    },
                )
            }
        }
    }

    fn mode_mapping(&self, mode: SearchMode, field_type: FieldType, language: Option<&str>) -> FieldMapping {
        let mapping = FieldMapping::of(field_type);
        match mode {
            SearchMode::Noop => mapping.with_index(IndexOption::NotAnalyzed),
            SearchMode::Basic => mapping.with_analyzer("standard"),
            SearchMode::Edge => mapping
                .with_index(IndexOption::Analyzed)
                .with_analyzer(AUTOCOMPLETE_ANALYZER)
                .with_search_analyzer(AUTOCOMPLETE_SEARCH_ANALYZER),
            SearchMode::Path => mapping
                .with_index(IndexOption::Analyzed)
                .with_analyzer(PATH_ANALYZER),
            SearchMode::Ngram => mapping
                .with_index(IndexOption::Analyzed)
                .with_analyzer(NGRAM_ANALYZER),
            SearchMode::Language => {
                let tag = language.unwrap_or_default();
                let analyzer = self.languages.analyzer_for(tag).unwrap_or(tag);
                mapping.with_analyzer(analyzer)
            }
        }
    }
}
