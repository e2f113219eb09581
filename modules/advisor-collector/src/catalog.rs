use serde_json::Value;
use tracing::warn;

/// One fan-out unit of work: fetch `actions_url`, file the result under
/// `service_name`. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub service_name: String,
    pub actions_url: String,
}

/// Derive one task per catalog entry. Iteration order is the catalog's own
/// and must not be assumed stable across runs. Entries missing a service
/// name or actions link are logged and skipped.
pub fn tasks_from_catalog(catalog: &Value) -> Vec<Task> {
    let Some(embedded) = catalog.get("_embedded").and_then(Value::as_object) else {
        warn!("catalog has no _embedded entries");
        return Vec::new();
    };

    embedded
        .iter()
        .filter_map(|(entry_url, details)| {
            let service_name = details.get("serviceName").and_then(Value::as_str);
            let actions_url = details
                .pointer("/_links/actions/href")
                .and_then(Value::as_str);
            match (service_name, actions_url) {
                (Some(name), Some(url)) => Some(Task {
                    service_name: name.to_string(),
                    actions_url: url.to_string(),
                }),
                _ => {
                    warn!(entry = entry_url.as_str(), "catalog entry missing serviceName or actions link, skipping");
                    None
                }
            }
        })
        .collect()
}
