//! Identity accessors for untyped resource documents.
//!
//! Resources flow through the engine as plain JSON; these helpers read
//! the well-known identity fields without forcing a typed unmarshal.

use std::collections::BTreeMap;

use serde_json::Value;

/// Check whether a resource slot is unset. A delete request is a request
/// whose new resource is empty.
pub fn is_empty(resource: &Value) -> bool {
    match resource {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

pub fn api_version(resource: &Value) -> &str {
    resource
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or("")
}

pub fn kind(resource: &Value) -> &str {
    resource.get("kind").and_then(Value::as_str).unwrap_or("")
}

pub fn name(resource: &Value) -> &str {
    metadata_str(resource, "name")
}

pub fn namespace(resource: &Value) -> &str {
    metadata_str(resource, "namespace")
}

pub fn labels(resource: &Value) -> BTreeMap<String, String> {
    metadata_map(resource, "labels")
}

pub fn annotations(resource: &Value) -> BTreeMap<String, String> {
    metadata_map(resource, "annotations")
}

fn metadata_str<'a>(resource: &'a Value, field: &str) -> &'a str {
    resource
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn metadata_map(resource: &Value, field: &str) -> BTreeMap<String, String> {
    resource
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
