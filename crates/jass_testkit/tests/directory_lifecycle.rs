//! Directory and document lifecycle through a provisioned tenant.

use jass_core::query::{span_filter, Interval, SearchClauses, SpanMatch, OFFSETS_PATH};
use jass_core::{CoreError, SearchParams, WriteOptions};
use jass_engine::{EngineMapping, FieldMapping, FieldType, SearchEngine};
use jass_testkit::{doc, TestTenant};
use serde_json::json;
use std::collections::BTreeMap;

#[test]
fn auto_generated_id_is_checked_per_type() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("docs");

    let id = docs
        .add_document(&doc(json!({"name": "anton", "age": 666})), WriteOptions::new())
        .unwrap();
    assert!(!id.is_empty());
    assert!(docs.document_exists(&id, Some("default")).unwrap());
    assert!(!docs.document_exists(&id, Some("other")).unwrap());
    assert!(docs.document_exists(&id, None).unwrap());
}

#[test]
fn explicit_id_round_trip_then_delete() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("docs");
    let body = doc(json!({"title": "hello"}));

    docs.add_or_update_document(&body, WriteOptions::new().with_id("x").with_doc_type("t"))
        .unwrap();
    let mut expected = body.clone();
    expected.insert("id".into(), json!("x"));
    assert_eq!(docs.get_document("x", "t").unwrap(), expected);

    docs.delete_document("x", "t").unwrap();
    assert!(matches!(
        docs.get_document("x", "t"),
        Err(CoreError::NotFound { .. })
    ));
}

#[test]
fn empty_doc_type_purges_and_keeps_accepting() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("docs");
    for i in 0..5 {
        docs.add_document(&doc(json!({"n": i})), WriteOptions::new().with_doc_type("batch"))
            .unwrap();
    }
    let all = SearchParams::new().with_doc_types(["batch"]);
    assert_eq!(docs.small_search(&all).unwrap().len(), 5);

    docs.empty_doc_type("batch").unwrap();
    assert!(docs.small_search(&all).unwrap().is_empty());

    let id = docs
        .add_document(&doc(json!({"n": 99})), WriteOptions::new().with_doc_type("batch"))
        .unwrap();
    let hits = docs.small_search(&all).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], json!(id));
    assert_eq!(hits[0]["type"], json!("batch"));
}

#[test]
fn binding_state_machine() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("docs");
    assert_eq!(docs.binding("t").unwrap(), None);

    let first = docs
        .add_or_update_schema(
            &EngineMapping::new().with_field("a", FieldMapping::of(FieldType::Long)),
            "t",
            false,
        )
        .unwrap();
    let again = docs
        .add_or_update_schema(
            &EngineMapping::new().with_field("b", FieldMapping::of(FieldType::Long)),
            "t",
            false,
        )
        .unwrap();
    assert_eq!(first, again);

    docs.delete_doc_type("t").unwrap();
    assert!(!tenant.engine.index_exists(&first).unwrap());
    assert!(matches!(
        docs.empty_doc_type("t"),
        Err(CoreError::NoSchemaFound { .. })
    ));
}

#[test]
fn writes_without_binding_can_be_refused() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("docs");
    let err = docs
        .add_or_update_document(
            &doc(json!({"a": 1})),
            WriteOptions::new()
                .with_doc_type("ghost")
                .require_existing_index(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::NoSchemaFound {
            doc_type: "ghost".into()
        }
    );
    assert_eq!(docs.binding("ghost").unwrap(), None);
}

#[test]
fn bounded_and_scanned_search_agree() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("docs");
    for i in 0..25 {
        let colour = if i % 2 == 0 { "red" } else { "blue" };
        docs.add_document(
            &doc(json!({"colour": colour, "rank": i})),
            WriteOptions::new().with_id(format!("d{i:02}")),
        )
        .unwrap();
    }
    let clauses = SearchClauses::new().with_filter_match("colour", "red");
    let scanned = docs
        .small_search(&SearchParams::new().with_clauses(clauses.clone()))
        .unwrap();
    let bounded = docs
        .small_search(&SearchParams::new().with_clauses(clauses).bounded())
        .unwrap();
    assert_eq!(scanned.len(), 13);
    assert_eq!(scanned, bounded);
    assert_eq!(tenant.engine.open_cursors(), 0);
}

#[test]
fn span_filters_select_annotations() {
    let tenant = TestTenant::new();
    let docs = tenant.directory("annotations");

    let mut offsets = BTreeMap::new();
    offsets.insert("begin".to_string(), FieldMapping::of(FieldType::Long));
    offsets.insert("end".to_string(), FieldMapping::of(FieldType::Long));
    let schema = EngineMapping::new()
        .with_field("label", FieldMapping::of(FieldType::String))
        .with_field(OFFSETS_PATH, FieldMapping::nested(offsets));
    docs.add_or_update_schema(&schema, "span", false).unwrap();

    for (id, begin, end) in [("inside", 12, 18), ("around", 5, 30), ("left", 0, 11), ("far", 40, 50)] {
        docs.add_document(
            &doc(json!({"label": id, "offsets": [{"begin": begin, "end": end}]})),
            WriteOptions::new().with_id(id).with_doc_type("span"),
        )
        .unwrap();
    }

    let ids = |mode| {
        let params = SearchParams::new()
            .with_doc_types(["span"])
            .with_filter(span_filter(OFFSETS_PATH, &Interval::closed(10, 20), mode))
            .bounded();
        let mut ids: Vec<String> = docs
            .small_search(&params)
            .unwrap()
            .into_iter()
            .map(|hit| hit["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        ids
    };
    assert_eq!(ids(SpanMatch::Nesting), vec!["around", "inside"]);
    assert_eq!(ids(SpanMatch::Overlap), vec!["around", "inside", "left"]);
}

#[test]
fn teardown_removes_every_index() {
    let tenant = TestTenant::new();
    let engine = tenant.engine.clone();
    tenant.directory("a");
    tenant.directory("b").add_document(&doc(json!({"x": 1})), WriteOptions::new()).unwrap();
    tenant.into_env().teardown().unwrap();
    assert!(engine.index_names().is_empty());
}
