// ── Resource schema metadata ──
//
// Shapes returned by `GET schemas`: for every resource, which fields are
// read-only, which are updateable, and the defaults a create form starts
// from. The API is PHP-backed, so empty objects sometimes arrive as `[]`
// and the parsers here accept either.

mod cache;

pub use cache::{CacheState, SchemaCache};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use pbx3_api::Payload;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Path of the schema endpoint, relative to the base endpoint.
pub const SCHEMAS_PATH: &str = "schemas";

/// How a field may be treated by an edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMutability {
    ReadOnly,
    Updateable,
    /// Not mentioned by the schema.
    Unlisted,
}

/// Metadata for one resource (e.g. `extensions`, `queues`, `cluster`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    #[serde(default, deserialize_with = "string_set")]
    pub read_only: BTreeSet<String>,
    #[serde(default, deserialize_with = "string_set")]
    pub updateable: BTreeSet<String>,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub defaults: Map<String, Value>,
}

impl ResourceSchema {
    pub fn is_read_only(&self, field: &str) -> bool {
        self.read_only.contains(field)
    }

    pub fn is_updateable(&self, field: &str) -> bool {
        self.updateable.contains(field)
    }

    /// Read-only wins if a field is listed in both sets.
    pub fn mutability(&self, field: &str) -> FieldMutability {
        if self.is_read_only(field) {
            FieldMutability::ReadOnly
        } else if self.is_updateable(field) {
            FieldMutability::Updateable
        } else {
            FieldMutability::Unlisted
        }
    }

    pub fn default_value(&self, field: &str) -> Option<&Value> {
        self.defaults.get(field)
    }

    /// The default as form text, or `None` when there is nothing to apply
    /// (missing, `null`, or empty string).
    pub fn default_text(&self, field: &str) -> Option<String> {
        match self.defaults.get(field)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other @ (Value::Array(_) | Value::Object(_)) => Some(other.to_string()),
        }
    }
}

/// Every resource schema published by the server. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct SchemaMap {
    resources: HashMap<String, Arc<ResourceSchema>>,
}

impl SchemaMap {
    /// Parse the body of `GET schemas`.
    ///
    /// The body must be a JSON object keyed by resource name. Entries that
    /// don't parse are skipped with a warning rather than failing the map.
    pub fn from_payload(payload: Payload) -> Result<Self, pbx3_api::Error> {
        let map = match payload {
            Payload::Json(Value::Object(map)) => map,
            other => {
                let body = other.into_json().to_string();
                return Err(pbx3_api::Error::Deserialization {
                    message: "expected a JSON object keyed by resource name".into(),
                    body,
                });
            }
        };

        let mut resources = HashMap::with_capacity(map.len());
        for (name, entry) in map {
            match ResourceSchema::deserialize(entry) {
                Ok(schema) => {
                    resources.insert(name, Arc::new(schema));
                }
                Err(e) => warn!(resource = %name, error = %e, "skipping malformed schema entry"),
            }
        }
        Ok(Self { resources })
    }

    pub fn get(&self, resource: &str) -> Option<&Arc<ResourceSchema>> {
        self.resources.get(resource)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resource names in sorted order.
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ResourceSchema>)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ── Lenient field parsers ────────────────────────────────────────────

fn string_set<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<String>, D::Error> {
    let strings = |items: Vec<Value>| {
        items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()
    };
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => strings(items),
        // PHP arrays with gaps in their keys serialize as objects.
        Value::Object(map) => strings(map.into_iter().map(|(_, v)| v).collect()),
        _ => BTreeSet::new(),
    })
}

fn object_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}
