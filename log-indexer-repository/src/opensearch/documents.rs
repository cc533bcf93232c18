//! Request bodies and response parsing for the OpenSearch REST API.
//!
//! Kept free of transport types so every shape can be checked against
//! literal JSON in tests.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::errors::StoreError;
use crate::lifecycle::Policy;
use crate::template::{IndexTemplate, TemplateSettings};
use crate::types::{BulkRequest, ItemStatus, StreamInfo};
use log_indexer_shared::{FieldType, Mapping, SearchResponse, DEFAULT_TIMESTAMP_FIELD};

/// Index setting that binds an index to an ISM policy.
pub const POLICY_ID_SETTING: &str = "opendistro.index_state_management.policy_id";

pub fn policy_path(id: &str) -> String {
    format!("_plugins/_ism/policies/{}", id)
}

pub fn template_path(name: &str) -> String {
    format!("_index_template/{}", name)
}

pub fn stream_path(name: &str) -> String {
    format!("_data_stream/{}", name)
}

pub fn stream_stats_path(name: &str) -> String {
    format!("_data_stream/{}/_stats", name)
}

pub fn policy_body(policy: &Policy) -> Result<Value, StoreError> {
    let policy = serde_json::to_value(policy)
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;
    Ok(json!({ "policy": policy }))
}

/// Parse `GET _plugins/_ism/policies/{id}`.
pub fn parse_policy(id: &str, body: &Value) -> Result<Policy, StoreError> {
    let document = body
        .get("policy")
        .cloned()
        .ok_or_else(|| StoreError::parse("policy response has no 'policy' object"))?;
    let mut policy: Policy =
        serde_json::from_value(document).map_err(|e| StoreError::parse(e.to_string()))?;
    policy.id = id.to_string();
    Ok(policy)
}

fn mapping_body(mapping: &Mapping, timestamp_field: &str) -> Value {
    let mut properties: Map<String, Value> = mapping
        .properties
        .iter()
        .map(|(name, field_type)| (name.clone(), json!({ "type": field_type.as_str() })))
        .collect();
    properties.insert(timestamp_field.to_string(), json!({ "type": "date" }));

    // `false` only stops indexing unknown fields; `strict` refuses them.
    let dynamic = if mapping.dynamic { json!(true) } else { json!("strict") };

    json!({
        "dynamic": dynamic,
        "properties": properties
    })
}

pub fn template_body(template: &IndexTemplate) -> Value {
    json!({
        "index_patterns": template.index_patterns,
        "data_stream": {
            "timestamp_field": { "name": template.timestamp_field }
        },
        "priority": template.priority,
        "template": {
            "settings": {
                "number_of_shards": template.settings.number_of_shards,
                "number_of_replicas": template.settings.number_of_replicas,
                POLICY_ID_SETTING: template.settings.policy_id
            },
            "mappings": mapping_body(&template.mapping, &template.timestamp_field)
        }
    })
}

// Settings come back nested (`index.number_of_shards`), dotted, or a mix of
// both; try every split of the dotted path.
fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let object = value.as_object()?;
    (1..=path.len()).find_map(|take| {
        let key = path[..take].join(".");
        object.get(&key).and_then(|child| lookup(child, &path[take..]))
    })
}

fn setting<'a>(settings: &'a Value, name: &str) -> Option<&'a Value> {
    let path: Vec<&str> = name.split('.').collect();
    lookup(settings, &path).or_else(|| {
        let mut prefixed = vec!["index"];
        prefixed.extend(path.iter());
        lookup(settings, &prefixed)
    })
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_mapping(mappings: &Value, timestamp_field: &str) -> Mapping {
    let dynamic = match mappings.get("dynamic") {
        None | Some(Value::Bool(true)) => true,
        Some(Value::String(s)) => s == "true",
        Some(_) => false,
    };

    let mut properties = BTreeMap::new();
    if let Some(fields) = mappings.get("properties").and_then(Value::as_object) {
        for (name, field) in fields {
            if name == timestamp_field {
                continue;
            }
            let field_type = match field.get("type").and_then(Value::as_str) {
                Some(type_name) => FieldType::from_name(type_name),
                // Sub-objects carry `properties` and no `type`.
                None => FieldType::Object,
            };
            properties.insert(name.clone(), field_type);
        }
    }

    Mapping {
        dynamic,
        properties,
    }
}

/// Parse `GET _index_template/{name}`.
pub fn parse_template(name: &str, body: &Value) -> Result<Option<IndexTemplate>, StoreError> {
    let templates = body
        .get("index_templates")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::parse("template response has no 'index_templates' array"))?;

    let Some(entry) = templates
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
    else {
        return Ok(None);
    };
    let document = entry
        .get("index_template")
        .ok_or_else(|| StoreError::parse("template entry has no 'index_template'"))?;

    let index_patterns = match document.get("index_patterns") {
        Some(Value::String(pattern)) => vec![pattern.clone()],
        Some(Value::Array(patterns)) => patterns
            .iter()
            .filter_map(|p| p.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    let timestamp_field = document
        .pointer("/data_stream/timestamp_field/name")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TIMESTAMP_FIELD)
        .to_string();

    let empty = json!({});
    let settings = document.pointer("/template/settings").unwrap_or(&empty);
    let mappings = document.pointer("/template/mappings").unwrap_or(&empty);

    // A template created outside this crate may carry no binding.
    let policy_id = setting(settings, POLICY_ID_SETTING)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Some(IndexTemplate {
        name: name.to_string(),
        index_patterns,
        settings: TemplateSettings {
            number_of_shards: setting(settings, "number_of_shards")
                .and_then(as_u64)
                .unwrap_or(1) as u32,
            number_of_replicas: setting(settings, "number_of_replicas")
                .and_then(as_u64)
                .unwrap_or(1) as u32,
            policy_id,
        },
        mapping: parse_mapping(mappings, &timestamp_field),
        priority: document.get("priority").and_then(as_u64).unwrap_or(0) as u32,
        timestamp_field,
    }))
}

/// Parse `GET _data_stream[/{name}]`.
pub fn parse_streams(body: &Value) -> Result<Vec<StreamInfo>, StoreError> {
    let streams = body
        .get("data_streams")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::parse("data stream response has no 'data_streams' array"))?;

    streams
        .iter()
        .map(|stream| {
            let name = stream
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::parse("data stream without a name"))?;
            Ok(StreamInfo {
                name: name.to_string(),
                template: stream
                    .get("template")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                timestamp_field: stream
                    .pointer("/timestamp_field/name")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_TIMESTAMP_FIELD)
                    .to_string(),
                generation: stream.get("generation").and_then(as_u64).unwrap_or(1),
                indices: stream
                    .get("indices")
                    .and_then(Value::as_array)
                    .map(|indices| {
                        indices
                            .iter()
                            .filter_map(|index| index.get("index_name").and_then(Value::as_str))
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// NDJSON lines of a bulk request: an action line, then the document.
pub fn bulk_lines(request: &BulkRequest<'_>) -> Result<Vec<Value>, StoreError> {
    let mut lines = Vec::with_capacity(request.len() * 2);
    for item in request.items() {
        lines.push(json!({ item.op.as_str(): { "_index": item.target } }));
        lines.push(
            serde_json::to_value(item.record)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        );
    }
    Ok(lines)
}

/// Parse the `items` of a bulk response, one status per request item.
pub fn parse_bulk_items(body: &Value, expected: usize) -> Result<Vec<ItemStatus>, StoreError> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::parse("bulk response has no 'items' array"))?;
    if items.len() != expected {
        return Err(StoreError::parse(format!(
            "bulk response has {} items for {} requests",
            items.len(),
            expected
        )));
    }

    items
        .iter()
        .map(|item| {
            let result = item
                .as_object()
                .and_then(|ops| ops.values().next())
                .ok_or_else(|| StoreError::parse("bulk item without an operation result"))?;
            let status = result.get("status").and_then(as_u64).unwrap_or(500) as u16;
            let error = result.get("error").map(|error| {
                let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
                match error.get("reason").and_then(Value::as_str) {
                    Some(reason) => format!("{}: {}", kind, reason),
                    None => kind.to_string(),
                }
            });
            Ok(ItemStatus { status, error })
        })
        .collect()
}

/// Parse the `_search` response down to the total and hit sources.
pub fn parse_search(body: &Value) -> SearchResponse {
    let total = match body.pointer("/hits/total") {
        Some(Value::Object(total)) => total.get("value").and_then(as_u64).unwrap_or(0),
        Some(other) => as_u64(other).unwrap_or(0),
        None => 0,
    };
    let documents = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(|hit| hit.get("_source").cloned()).collect())
        .unwrap_or_default();

    SearchResponse { total, documents }
}

pub fn parse_count(body: &Value) -> Result<u64, StoreError> {
    body.get("count")
        .and_then(as_u64)
        .ok_or_else(|| StoreError::parse("count response has no 'count'"))
}

/// Parse `GET _data_stream/{name}/_stats` into (store size, backing indices).
pub fn parse_stream_stats(name: &str, body: &Value) -> Result<(u64, u64), StoreError> {
    let stream = body
        .get("data_streams")
        .and_then(Value::as_array)
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.get("data_stream").and_then(Value::as_str) == Some(name))
        })
        .ok_or_else(|| StoreError::not_found(name))?;

    let size = stream.get("store_size_bytes").and_then(as_u64).unwrap_or(0);
    let indices = stream.get("backing_indices").and_then(as_u64).unwrap_or(0);
    Ok((size, indices))
}

/// Whether a `_cluster/health` response reports a usable cluster.
///
/// Only `red` counts as unhealthy.
pub fn is_healthy(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) != Some("red")
}
