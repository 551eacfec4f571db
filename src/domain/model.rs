use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resource row as returned by Azure Resource Graph. Azure payloads are
/// open-schema, so `properties` and `tags` stay as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub resource_group: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub sku: Option<Sku>,
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Sku {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingSource {
    KnowledgeBase,
    Ai,
}

/// One scan hit with its annotation. The knowledge base always fills these
/// fields; AI classification may overwrite reason/recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub resource: Resource,
    pub issue: String,
    pub reason: String,
    pub recommendation: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_monthly_cost: Option<f64>,
    pub source: FindingSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Orphaned,
    Deprecated,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Orphaned => "orphaned",
            ScanKind::Deprecated => "deprecated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub kind: ScanKind,
    pub findings: Vec<Finding>,
    pub total: usize,
    pub scanned_at: DateTime<Utc>,
    pub ai_used: bool,
    pub message: String,
}

/// What the LLM is asked to return per resource: a JSON array of
/// `{id, name, type, reason, recommendation}` objects. Parsed leniently
/// because models drift from the requested schema.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AiClassification {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted: Vec<DeleteOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeOutcome {
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl UpgradeOutcome {
    pub fn failure(resource_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: None,
            success: false,
            skipped: false,
            error: Some(error.into()),
            warnings: Vec::new(),
            details: None,
        }
    }

    pub fn skipped(resource_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: None,
            success: true,
            skipped: true,
            error: None,
            warnings: Vec::new(),
            details: Some(serde_json::json!({ "message": reason.into() })),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeReport {
    pub success: bool,
    pub total_resources: usize,
    pub successful_upgrades: usize,
    pub failed_upgrades: usize,
    pub skipped_upgrades: usize,
    pub individual_results: Vec<UpgradeOutcome>,
}
