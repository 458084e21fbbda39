//! Conversions between typed records and engine documents.

use crate::error::{CoreError, CoreResult};
use jass_engine::Document;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub(crate) fn to_document<T: Serialize>(value: &T) -> CoreResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CoreError::invalid_schema("record did not serialize to an object")),
        Err(err) => Err(CoreError::invalid_schema(err.to_string())),
    }
}

pub(crate) fn from_document<T: DeserializeOwned>(id: &str, doc: Document) -> CoreResult<T> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|err| CoreError::invalid_schema(format!("stored record {id}: {err}")))
}
