//! Storage account optimization: move locally-redundant accounts to
//! zone- or geo-redundant SKUs where the region supports it, and flag
//! legacy account kinds that need manual migration.

use crate::azure::arm::api_versions;
use crate::domain::model::UpgradeOutcome;
use crate::domain::ports::ResourceManager;
use crate::domain::resource_id::ResourceId;
use crate::utils::error::{OptimizerError, Result};

/// Regions with availability zone support where ZRS/GZRS is available.
const ZONE_REGIONS: &[&str] = &["eastus", "westus2", "northeurope", "westeurope"];

pub struct StorageAccountUpgradeAgent<'a> {
    arm: &'a dyn ResourceManager,
}

impl<'a> StorageAccountUpgradeAgent<'a> {
    pub fn new(arm: &'a dyn ResourceManager) -> Self {
        Self { arm }
    }

    pub async fn upgrade(&self, resource_id: &ResourceId) -> UpgradeOutcome {
        let id = resource_id.to_string();
        match self.run(&id).await {
            Ok(outcome) => outcome,
            Err(e) => UpgradeOutcome::failure(&id, e.to_string()),
        }
    }

    async fn run(&self, id: &str) -> Result<UpgradeOutcome> {
        let account = self
            .arm
            .get_resource(id, api_versions::STORAGE)
            .await
            .map_err(|e| stage_error("fetch", e))?;

        let kind = account.get("kind").and_then(|v| v.as_str()).unwrap_or("");
        if kind.eq_ignore_ascii_case("Storage") {
            // 傳統 (general-purpose v1) 帳戶需另行遷移,不能直接換 SKU
            let mut outcome = UpgradeOutcome::skipped(
                id,
                "Legacy general-purpose v1 account; migrate to StorageV2 before changing redundancy",
            );
            outcome.resource_type = Some("Microsoft.Storage/storageAccounts".to_string());
            outcome.warnings.push(
                "Account kind 'Storage' requires a StorageV2 migration first".to_string(),
            );
            return Ok(outcome);
        }

        let current_sku = account
            .pointer("/sku/name")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let location = account
            .get("location")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let Some(target_sku) = target_sku(current_sku, &location) else {
            // 無可用區的區域只給建議,不動帳戶
            let reason = if current_sku.eq_ignore_ascii_case("Standard_LRS") {
                format!(
                    "Region {} has no availability zone support; review a manual move to Standard_GRS instead",
                    location
                )
            } else {
                format!("SKU {} needs no redundancy change", current_sku)
            };
            tracing::info!("⏭️ {} skipped: {}", id, reason);
            let mut outcome = UpgradeOutcome::skipped(id, reason);
            outcome.resource_type = Some("Microsoft.Storage/storageAccounts".to_string());
            return Ok(outcome);
        };

        let mut warnings = Vec::new();
        if account
            .pointer("/properties/accessTier")
            .and_then(|v| v.as_str())
            .is_some_and(|t| t.eq_ignore_ascii_case("Hot"))
        {
            warnings.push(
                "Hot access tier on all blobs; consider lifecycle management rules for cold data"
                    .to_string(),
            );
        }

        let mut body = account.clone();
        body["sku"] = serde_json::json!({ "name": target_sku });
        if let Some(map) = body.as_object_mut() {
            map.remove("id");
            map.remove("name");
            map.remove("type");
            map.remove("etag");
        }
        if let Some(props) = body["properties"].as_object_mut() {
            props.remove("provisioningState");
            props.remove("creationTime");
            props.remove("primaryEndpoints");
            props.remove("secondaryEndpoints");
            props.remove("statusOfPrimary");
            props.remove("statusOfSecondary");
        }

        self.arm
            .put_resource(id, api_versions::STORAGE, &body)
            .await
            .map_err(|e| stage_error("upgrade", e))?;

        tracing::info!("✅ Changed {} redundancy {} → {}", id, current_sku, target_sku);
        Ok(UpgradeOutcome {
            resource_id: id.to_string(),
            resource_type: Some("Microsoft.Storage/storageAccounts".to_string()),
            success: true,
            skipped: false,
            error: None,
            warnings,
            details: Some(serde_json::json!({
                "previousSku": current_sku,
                "newSku": target_sku,
            })),
        })
    }
}

/// Redundancy target for a SKU, `None` when no change applies. Only the
/// zone-capable regions get an automatic change; elsewhere the account is
/// left untouched.
fn target_sku(current: &str, location: &str) -> Option<&'static str> {
    if !ZONE_REGIONS.contains(&location) {
        return None;
    }
    if current.eq_ignore_ascii_case("Standard_LRS") {
        Some("Standard_ZRS")
    } else if current.eq_ignore_ascii_case("Standard_GRS") {
        Some("Standard_GZRS")
    } else {
        None
    }
}

fn stage_error(stage: &str, source: OptimizerError) -> OptimizerError {
    OptimizerError::UpgradeError {
        stage: stage.to_string(),
        details: source.to_string(),
    }
}
