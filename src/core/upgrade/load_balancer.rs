//! Basic → Standard Load Balancer upgrade. Frontend Public IPs must be
//! Standard SKU before the load balancer itself can move, so incompatible
//! frontends fail the upgrade with a pointer at the prerequisite.

use crate::azure::arm::api_versions;
use crate::domain::model::UpgradeOutcome;
use crate::domain::ports::ResourceManager;
use crate::domain::resource_id::ResourceId;
use crate::utils::error::{OptimizerError, Result};

pub struct LoadBalancerUpgradeAgent<'a> {
    arm: &'a dyn ResourceManager,
}

impl<'a> LoadBalancerUpgradeAgent<'a> {
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
        let lb = self
            .arm
            .get_resource(id, api_versions::NETWORK)
            .await
            .map_err(|e| stage_error("fetch", e))?;

        let current_sku = lb
            .pointer("/sku/name")
            .and_then(|v| v.as_str())
            .unwrap_or("Basic");
        if current_sku.eq_ignore_ascii_case("Standard") {
            tracing::info!("⏭️ {} is already Standard SKU, skipping", id);
            return Ok(UpgradeOutcome {
                resource_type: Some("Microsoft.Network/loadBalancers".to_string()),
                ..UpgradeOutcome::skipped(id, "Load balancer is already Standard SKU")
            });
        }

        let basic_frontends = self.basic_frontend_ips(&lb).await?;
        if !basic_frontends.is_empty() {
            let mut outcome = UpgradeOutcome::failure(
                id,
                format!(
                    "Frontend Public IPs still on Basic SKU must be upgraded first: {}",
                    basic_frontends.join(", ")
                ),
            );
            outcome.resource_type = Some("Microsoft.Network/loadBalancers".to_string());
            return Ok(outcome);
        }

        let mut body = lb.clone();
        body["sku"] = serde_json::json!({ "name": "Standard", "tier": "Regional" });
        if let Some(map) = body.as_object_mut() {
            map.remove("etag");
        }
        if let Some(props) = body["properties"].as_object_mut() {
            props.remove("provisioningState");
        }

        self.arm
            .put_resource(id, api_versions::NETWORK, &body)
            .await
            .map_err(|e| stage_error("upgrade", e))?;

        tracing::info!("✅ Upgraded {} to Standard SKU", id);
        Ok(UpgradeOutcome {
            resource_id: id.to_string(),
            resource_type: Some("Microsoft.Network/loadBalancers".to_string()),
            success: true,
            skipped: false,
            error: None,
            warnings: vec![
                "Standard Load Balancer denies inbound traffic by default; review NSG rules"
                    .to_string(),
            ],
            details: Some(serde_json::json!({
                "previousSku": current_sku,
                "newSku": "Standard",
            })),
        })
    }

    /// Frontend Public IPs that are still Basic SKU.
    async fn basic_frontend_ips(&self, lb: &serde_json::Value) -> Result<Vec<String>> {
        let mut basic = Vec::new();

        let frontends = lb
            .pointer("/properties/frontendIPConfigurations")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        for frontend in frontends {
            let Some(pip_id) = frontend
                .pointer("/properties/publicIPAddress/id")
                .and_then(|v| v.as_str())
            else {
                continue;
            };

            let pip = self
                .arm
                .get_resource(pip_id, api_versions::NETWORK)
                .await
                .map_err(|e| stage_error("fetch-frontend-ip", e))?;
            let sku = pip
                .pointer("/sku/name")
                .and_then(|v| v.as_str())
                .unwrap_or("Basic");
            if !sku.eq_ignore_ascii_case("Standard") {
                basic.push(pip_id.to_string());
            }
        }

        Ok(basic)
    }
}

fn stage_error(stage: &str, source: OptimizerError) -> OptimizerError {
    OptimizerError::UpgradeError {
        stage: stage.to_string(),
        details: source.to_string(),
    }
}
