//! Schema registration, compilation and use in a directory.

use jass_core::query::SearchClauses;
use jass_core::schema::{hash_schema_identity, SchemaMetadata, SchemaQuery};
use jass_core::{CoreError, SearchParams, WriteOptions};
use jass_engine::{FieldType, IndexOption};
use jass_testkit::{doc, TestTenant};
use serde_json::json;

const WORD_SCHEMA: &str =
    r#"{"word":{"type":"string","searchable":true,"searchModes":["basic","edge"]}}"#;

#[test]
fn word_schema_compiles_to_basic_and_edge() {
    let tenant = TestTenant::new();
    let mapping = tenant.schemas().compiler().compile_str(WORD_SCHEMA, &[]).unwrap();
    let word = mapping.field("word").unwrap();
    assert_eq!(word.field_type, Some(FieldType::String));
    assert_eq!(word.analyzer.as_deref(), Some("standard"));

    let edge = &word.fields["edge"];
    assert_eq!(edge.index, Some(IndexOption::Analyzed));
    assert_eq!(edge.analyzer.as_deref(), Some("autocomplete"));
    assert_eq!(edge.search_analyzer.as_deref(), Some("autocomplete_search"));
}

#[test]
fn identical_text_registers_once() {
    let tenant = TestTenant::new();
    let schemas = tenant.schemas();
    let first = schemas.register_schema(WORD_SCHEMA, &[]).unwrap();
    let second = schemas.register_schema(WORD_SCHEMA, &[]).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, hash_schema_identity(WORD_SCHEMA));
    assert_eq!(schemas.find_schemas(&SchemaQuery::default()).unwrap().len(), 1);
}

#[test]
fn reordered_text_shares_the_compiled_mapping() {
    let tenant = TestTenant::new();
    let schemas = tenant.schemas();
    let reordered =
        r#"{"word":{"searchModes":["basic","edge"],"searchable":true,"type":"string"}}"#;

    let a = schemas.get_schema_info(&schemas.register_schema(WORD_SCHEMA, &[]).unwrap()).unwrap();
    let b = schemas.get_schema_info(&schemas.register_schema(reordered, &[]).unwrap()).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.es_hash, b.es_hash);
    assert_eq!(
        tenant.engine.document_count(schemas.es_index()),
        Some(1)
    );
    assert!(schemas.get_mapping(&a.es_hash).unwrap().field("word").is_some());
}

#[test]
fn metadata_is_searchable() {
    let tenant = TestTenant::new();
    let schemas = tenant.schemas();
    let id = schemas
        .add_schema(
            r#"{"age":{"type":"integer"}}"#,
            SchemaMetadata::new()
                .with_id("people")
                .with_name("People")
                .with_description("registered persons"),
            &[],
        )
        .unwrap();
    assert_eq!(id, "people");
    assert!(matches!(
        schemas.add_schema(r#"{"x":{"type":"string"}}"#, SchemaMetadata::new().with_id("people"), &[]),
        Err(CoreError::AlreadyExists { .. })
    ));

    let by_name = SchemaQuery {
        name: Some("people".into()),
        ..SchemaQuery::default()
    };
    let found = schemas.find_schemas(&by_name).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].description.as_deref(), Some("registered persons"));
    assert_eq!(found[0].schema().unwrap(), json!({"age": {"type": "integer"}}));

    let by_hash = SchemaQuery {
        es_hash: Some(found[0].es_hash.clone()),
        ..SchemaQuery::default()
    };
    assert_eq!(schemas.find_schemas(&by_hash).unwrap().len(), 1);
    assert!(schemas.get_schema_info("nobody").unwrap_err().is_not_found());
}

#[test]
fn compiled_schema_drives_a_strict_type() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("lexicon");
    let mapping = tenant.schemas().compiler().compile_str(WORD_SCHEMA, &[]).unwrap();
    docs.add_or_update_schema(&mapping, "entry", false).unwrap();

    for word in ["anton", "antelope", "bison"] {
        docs.add_document(&doc(json!({"word": word})), WriteOptions::new().with_doc_type("entry"))
            .unwrap();
    }
    let prefix = SearchParams::new()
        .with_doc_types(["entry"])
        .with_clauses(SearchClauses::new().with_match("word.edge", "ant"));
    assert_eq!(docs.small_search(&prefix).unwrap().len(), 2);

    let violation = docs
        .add_document(
            &doc(json!({"word": "x", "gloss": "y"})),
            WriteOptions::new().with_doc_type("entry"),
        )
        .unwrap_err();
    assert!(matches!(violation, CoreError::SchemaViolation { field, .. } if field == "gloss"));
}

#[test]
fn migration_through_document_writes() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("lexicon");
    let compiler = tenant.schemas().compiler();
    let v1 = compiler.compile_str(r#"{"word":{"type":"string"}}"#, &[]).unwrap();
    let v2 = compiler
        .compile_str(r#"{"word":{"type":"string"},"count":{"type":"integer"}}"#, &[])
        .unwrap();
    let dropped = compiler.compile_str(r#"{"count":{"type":"integer"}}"#, &[]).unwrap();

    let options = WriteOptions::new().with_doc_type("entry");
    docs.add_document(&doc(json!({"word": "a"})), options.clone().with_schema(v1))
        .unwrap();
    docs.add_document(&doc(json!({"word": "b", "count": 2})), options.clone().with_schema(v2))
        .unwrap();
    assert_eq!(
        docs.add_document(&doc(json!({"count": 3})), options.with_schema(dropped)),
        Err(CoreError::MigrationDeleteNotSupported {
            field: "word".into()
        })
    );
}
