use std::sync::Mutex;

use serde_json::{Map, Value};

/// Accumulates detail documents keyed by logical service name, merging when
/// two catalog entries resolve to the same name (a superseded API version
/// under the same prefix, typically).
#[derive(Debug, Default)]
pub struct ActionsAggregate {
    entries: Mutex<Map<String, Value>>,
}

impl ActionsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one task's detail document. The first write for a name stores
    /// the document as-is; a collision merges — incoming `_links.results`
    /// elements append to the existing list (completion order), and the
    /// incoming `_embedded` object shallow-merges in, incoming keys winning.
    pub fn record(&self, name: &str, data: Value) {
        let mut entries = self.entries.lock().expect("aggregate lock poisoned");
        match entries.get_mut(name) {
            Some(existing) => merge_detail(existing, data),
            None => {
                entries.insert(name.to_string(), data);
            }
        }
    }

    /// Copy of the accumulated map, read once at emission time.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.entries.lock().expect("aggregate lock poisoned").clone()
    }
}

fn merge_detail(existing: &mut Value, incoming: Value) {
    let mut incoming = match incoming {
        Value::Object(map) => map,
        // Degenerate document: defined last-write-wins.
        other => {
            *existing = other;
            return;
        }
    };
    if !existing.is_object() {
        *existing = Value::Object(incoming);
        return;
    }
    let existing = existing.as_object_mut().expect("checked object");

    let incoming_links = incoming
        .get("_links")
        .and_then(|links| links.get("results"))
        .and_then(Value::as_array)
        .cloned();
    let incoming_embedded = incoming.remove("_embedded");

    if let Some(links) = incoming_links {
        let results = ensure_array(ensure_object(existing, "_links"), "results");
        results.extend(links);
    }

    if let Some(Value::Object(embedded)) = incoming_embedded {
        let target = ensure_object(existing, "_embedded");
        for (key, value) in embedded {
            target.insert(key, value);
        }
    }
}

/// `map[key]` as a mutable object, materializing it (and replacing a
/// non-object value) if needed.
fn ensure_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut().expect("checked object")
}

/// `map[key]` as a mutable array, materializing it if needed.
fn ensure_array<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Vec<Value> {
    let slot = map.entry(key).or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut().expect("checked array")
}
