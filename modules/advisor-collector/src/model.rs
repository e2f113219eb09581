//! Typed view over the raw aggregate: per-service summaries keyed by display
//! name, with actions, calculated action groups and sorted condition keys.
//! The raw aggregate stays the artifact of record; this map is the processed
//! form consumers actually read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::collector::CollectionReport;

// Console wire shapes, deserialized per entry so one malformed service never
// poisons the whole map.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawService {
    service_display_name: String,
    service_name: String,
    description: String,
    arn_format: String,
    arn_regex: String,
    actions_doc_root: String,
    auth_z_doc_page: String,
    concepts_doc_root: String,
    context_keys_doc_root: String,
    api_detail_root: String,
    api_doc_root: String,
    api_reference_doc_page: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    id: String,
    description: String,
    action_groups: Vec<String>,
    api_doc: String,
    doc_page_rel: String,
    doc_page: String,
    #[serde(default)]
    context_keys: Vec<RawContextKey>,
}

#[derive(Debug, Deserialize)]
struct RawContextKey {
    name: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceDocs {
    pub actions_doc_root: String,
    pub authz_doc_page: String,
    pub concepts_doc_root: String,
    pub context_keys_doc_root: String,
    pub api_detail_root: String,
    pub api_doc_root: String,
    pub api_reference_doc_page: String,
}

#[derive(Debug, Serialize)]
pub struct ActionDocs {
    pub api_doc: String,
    pub doc_page_rel: String,
    pub doc_page: String,
}

#[derive(Debug, Serialize)]
pub struct ActionSummary {
    pub description: String,
    pub aws_action_groups: Vec<String>,
    pub calculated_action_group: String,
    pub docs: ActionDocs,
    pub condition_keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceSummary {
    pub prefix: String,
    pub description: String,
    pub arn_format: String,
    pub arn_regex: String,
    pub docs: ServiceDocs,
    pub actions: BTreeMap<String, ActionSummary>,
}

impl From<RawService> for ServiceSummary {
    fn from(raw: RawService) -> Self {
        Self {
            prefix: raw.service_name,
            description: raw.description,
            arn_format: raw.arn_format,
            arn_regex: raw.arn_regex,
            docs: ServiceDocs {
                actions_doc_root: raw.actions_doc_root,
                authz_doc_page: raw.auth_z_doc_page,
                concepts_doc_root: raw.concepts_doc_root,
                context_keys_doc_root: raw.context_keys_doc_root,
                api_detail_root: raw.api_detail_root,
                api_doc_root: raw.api_doc_root,
                api_reference_doc_page: raw.api_reference_doc_page,
            },
            actions: BTreeMap::new(),
        }
    }
}

impl From<RawAction> for ActionSummary {
    fn from(raw: RawAction) -> Self {
        let calculated = calculated_action_group(&raw.action_groups).to_string();
        let mut condition_keys: Vec<String> =
            raw.context_keys.into_iter().map(|k| k.name).collect();
        condition_keys.sort();
        Self {
            description: raw.description,
            aws_action_groups: raw.action_groups,
            calculated_action_group: calculated,
            docs: ActionDocs {
                api_doc: raw.api_doc,
                doc_page_rel: raw.doc_page_rel,
                doc_page: raw.doc_page,
            },
            condition_keys,
        }
    }
}

/// Collapse the console's action groups into one bucket that makes more
/// sense, most privileged first.
fn calculated_action_group(groups: &[String]) -> &'static str {
    if groups.iter().any(|g| g == "Permissions") {
        return "Permissions";
    }
    if groups.iter().any(|g| g == "ListOnly") {
        return "List";
    }
    if groups.iter().any(|g| g == "ReadOnly") {
        return "Read";
    }
    if groups.iter().any(|g| g == "Tagging") {
        return "Tagging";
    }
    if groups.iter().any(|g| g == "ReadWrite") {
        return "Write";
    }
    "Unknown"
}

/// Build the formatted per-service map from a raw collection report, keyed
/// by display name. Unparseable entries are logged and skipped.
pub fn build_service_map(report: &CollectionReport) -> BTreeMap<String, ServiceSummary> {
    let mut display_names: BTreeMap<String, String> = BTreeMap::new();
    let mut services: BTreeMap<String, ServiceSummary> = BTreeMap::new();

    let embedded = report.services.get("_embedded").and_then(Value::as_object);
    for (entry_url, details) in embedded.into_iter().flatten() {
        match serde_json::from_value::<RawService>(details.clone()) {
            Ok(raw) => {
                display_names.insert(raw.service_name.clone(), raw.service_display_name.clone());
                services.insert(raw.service_name.clone(), ServiceSummary::from(raw));
            }
            Err(e) => {
                warn!(entry = entry_url.as_str(), error = %e, "unparseable service entry, skipping");
            }
        }
    }

    for (prefix, detail) in &report.actions {
        let Some(summary) = services.get_mut(prefix) else {
            warn!(prefix = prefix.as_str(), "actions for unknown service, skipping");
            continue;
        };
        let embedded = detail.get("_embedded").and_then(Value::as_object);
        for (action_url, body) in embedded.into_iter().flatten() {
            match serde_json::from_value::<RawAction>(body.clone()) {
                Ok(raw) => {
                    summary.actions.insert(raw.id.clone(), ActionSummary::from(raw));
                }
                Err(e) => {
                    warn!(action = action_url.as_str(), error = %e, "unparseable action entry, skipping");
                }
            }
        }
    }

    services
        .into_iter()
        .map(|(prefix, summary)| {
            let display = display_names.remove(&prefix).unwrap_or(prefix);
            (display, summary)
        })
        .collect()
}
