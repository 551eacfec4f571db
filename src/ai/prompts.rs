//! Prompt construction for scan classification. The model is asked for a
//! bare JSON array so the answer can be parsed without tool calling.

use crate::domain::model::{Resource, ScanKind};

pub const SYSTEM_PROMPT: &str = "You are an Azure cloud governance expert. \
You analyze Azure resources and answer strictly with JSON. \
Never include explanations outside the JSON array.";

/// Compact per-resource summary fed to the model. Full properties payloads
/// are too large for the context window, so only the decisive fields go in.
fn resource_summary(resource: &Resource) -> serde_json::Value {
    serde_json::json!({
        "id": resource.id,
        "name": resource.name,
        "type": resource.resource_type,
        "location": resource.location,
        "sku": resource.sku,
        "properties": trimmed_properties(resource),
    })
}

fn trimmed_properties(resource: &Resource) -> serde_json::Value {
    const KEYS: &[&str] = &[
        "sku",
        "managedBy",
        "diskState",
        "diskSizeGB",
        "ipConfiguration",
        "publicIPAllocationMethod",
        "virtualMachine",
        "subnets",
        "networkInterfaces",
        "hardwareProfile",
        "accessTier",
        "creationData",
    ];

    let mut trimmed = serde_json::Map::new();
    if let Some(map) = resource.properties.as_object() {
        for key in KEYS {
            if let Some(value) = map.get(*key) {
                trimmed.insert((*key).to_string(), value.clone());
            }
        }
    }
    serde_json::Value::Object(trimmed)
}

pub fn classification_prompt(kind: ScanKind, resources: &[Resource]) -> String {
    let payload: Vec<serde_json::Value> = resources.iter().map(resource_summary).collect();
    let payload = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "[]".to_string());

    let task = match kind {
        ScanKind::Orphaned => {
            "Identify which of these Azure resources are orphaned (not attached to or used by \
             any other resource) and explain why each one is orphaned."
        }
        ScanKind::Deprecated => {
            "Identify which of these Azure resources use deprecated or soon-to-be-retired \
             configurations (e.g. Basic SKU Public IPs and Load Balancers retiring \
             September 30, 2025, unmanaged disks, old VM generations) and explain the risk."
        }
    };

    format!(
        "{task}\n\n\
         Resources:\n{payload}\n\n\
         Respond with a JSON array only. One object per affected resource:\n\
         [{{\"id\": \"<resource id>\", \"name\": \"<name>\", \"type\": \"<type>\", \
         \"reason\": \"<why it is affected>\", \"recommendation\": \"<what to do>\"}}]\n\
         If no resource is affected, respond with []."
    )
}
