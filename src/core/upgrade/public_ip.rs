//! Basic → Standard Public IP upgrade. The SKU cannot be changed while the
//! address is associated, so the workflow is dissociate, upgrade,
//! re-associate — and re-associate is also the rollback path when the SKU
//! change itself fails.

use crate::azure::arm::api_versions;
use crate::domain::model::UpgradeOutcome;
use crate::domain::ports::ResourceManager;
use crate::domain::resource_id::ResourceId;
use crate::utils::error::{OptimizerError, Result};

/// A resource that held a reference to the public IP before the upgrade,
/// with its untouched payload kept for re-association.
struct Attachment {
    owner_id: String,
    api_version: &'static str,
    original_body: serde_json::Value,
}

pub struct PublicIpUpgradeAgent<'a> {
    arm: &'a dyn ResourceManager,
}

impl<'a> PublicIpUpgradeAgent<'a> {
    pub fn new(arm: &'a dyn ResourceManager) -> Self {
        Self { arm }
    }

    pub async fn upgrade(&self, resource_id: &ResourceId) -> UpgradeOutcome {
        let id = resource_id.to_string();
        match self.run(resource_id, &id).await {
            Ok(outcome) => outcome,
            Err(e) => UpgradeOutcome::failure(&id, e.to_string()),
        }
    }

    async fn run(&self, resource_id: &ResourceId, id: &str) -> Result<UpgradeOutcome> {
        let pip = self
            .arm
            .get_resource(id, api_versions::NETWORK)
            .await
            .map_err(|e| stage_error("fetch", e))?;

        if sku_name(&pip).is_some_and(|s| s.eq_ignore_ascii_case("Standard")) {
            tracing::info!("⏭️ {} is already Standard SKU, skipping", id);
            return Ok(UpgradeOutcome {
                resource_type: Some("Microsoft.Network/publicIPAddresses".to_string()),
                ..UpgradeOutcome::skipped(id, "Public IP is already Standard SKU")
            });
        }

        let attachments = self.find_attachments(resource_id, &pip, id).await?;
        tracing::info!(
            "🔗 {} has {} attachment(s) to dissociate",
            id,
            attachments.len()
        );

        self.dissociate(&attachments, id)
            .await
            .map_err(|e| stage_error("dissociate", e))?;

        // SKU 變更失敗也要還原關聯
        let upgraded = self.apply_sku_change(id, &pip).await;
        let mut warnings = self.reassociate(&attachments, id).await;

        match upgraded {
            Ok(()) => {
                tracing::info!("✅ Upgraded {} to Standard SKU", id);
                Ok(UpgradeOutcome {
                    resource_id: id.to_string(),
                    resource_type: Some("Microsoft.Network/publicIPAddresses".to_string()),
                    success: true,
                    skipped: false,
                    error: None,
                    warnings: std::mem::take(&mut warnings),
                    details: Some(serde_json::json!({
                        "previousSku": sku_name(&pip).unwrap_or("Basic"),
                        "newSku": "Standard",
                        "reassociated": attachments.len(),
                    })),
                })
            }
            Err(e) => {
                tracing::error!("❌ SKU change failed for {}, associations restored: {}", id, e);
                let mut outcome =
                    UpgradeOutcome::failure(id, stage_error("upgrade", e).to_string());
                outcome.resource_type = Some("Microsoft.Network/publicIPAddresses".to_string());
                outcome.warnings = warnings;
                Ok(outcome)
            }
        }
    }

    /// Attachments come from two places: the NIC referenced by the address
    /// itself, and load balancer frontends in the same resource group.
    async fn find_attachments(
        &self,
        resource_id: &ResourceId,
        pip: &serde_json::Value,
        id: &str,
    ) -> Result<Vec<Attachment>> {
        let mut attachments = Vec::new();

        if let Some(ip_config_id) = pip
            .pointer("/properties/ipConfiguration/id")
            .and_then(|v| v.as_str())
        {
            let nic_id = owning_nic_id(ip_config_id);
            let body = self
                .arm
                .get_resource(&nic_id, api_versions::NETWORK)
                .await
                .map_err(|e| stage_error("fetch-nic", e))?;
            attachments.push(Attachment {
                owner_id: nic_id,
                api_version: api_versions::NETWORK,
                original_body: body,
            });
        }

        let lb_collection = resource_id.sibling_collection("Microsoft.Network", "loadBalancers");
        let load_balancers = self
            .arm
            .list_resources(&lb_collection, api_versions::NETWORK)
            .await
            .map_err(|e| stage_error("list-load-balancers", e))?;

        for lb in load_balancers {
            if references_public_ip(&lb, id) {
                if let Some(lb_id) = lb.get("id").and_then(|v| v.as_str()) {
                    attachments.push(Attachment {
                        owner_id: lb_id.to_string(),
                        api_version: api_versions::NETWORK,
                        original_body: lb,
                    });
                }
            }
        }

        Ok(attachments)
    }

    async fn dissociate(&self, attachments: &[Attachment], pip_id: &str) -> Result<()> {
        for attachment in attachments {
            let mut body = attachment.original_body.clone();
            strip_public_ip_refs(&mut body, pip_id);
            tracing::info!("🔌 Dissociating {} from {}", pip_id, attachment.owner_id);
            self.arm
                .put_resource(&attachment.owner_id, attachment.api_version, &body)
                .await?;
        }
        Ok(())
    }

    async fn apply_sku_change(&self, id: &str, pip: &serde_json::Value) -> Result<()> {
        let mut body = pip.clone();
        body["sku"] = serde_json::json!({ "name": "Standard", "tier": "Regional" });
        // Standard SKU 只支援靜態配置
        body["properties"]["publicIPAllocationMethod"] = serde_json::json!("Static");
        if let Some(map) = body.as_object_mut() {
            map.remove("etag");
        }
        if let Some(props) = body["properties"].as_object_mut() {
            props.remove("ipConfiguration");
            props.remove("provisioningState");
        }

        self.arm.put_resource(id, api_versions::NETWORK, &body).await?;
        Ok(())
    }

    async fn reassociate(&self, attachments: &[Attachment], pip_id: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        for attachment in attachments {
            tracing::info!("🔗 Re-associating {} with {}", pip_id, attachment.owner_id);
            if let Err(e) = self
                .arm
                .put_resource(
                    &attachment.owner_id,
                    attachment.api_version,
                    &attachment.original_body,
                )
                .await
            {
                let warning = format!(
                    "Failed to re-associate {} with {}: {}",
                    pip_id, attachment.owner_id, e
                );
                tracing::warn!("⚠️ {}", warning);
                warnings.push(warning);
            }
        }
        warnings
    }
}

fn stage_error(stage: &str, source: OptimizerError) -> OptimizerError {
    OptimizerError::UpgradeError {
        stage: stage.to_string(),
        details: source.to_string(),
    }
}

fn sku_name(resource: &serde_json::Value) -> Option<&str> {
    resource.pointer("/sku/name").and_then(|v| v.as_str())
}

/// `/..../networkInterfaces/nic1/ipConfigurations/ipconfig1` → the NIC id.
fn owning_nic_id(ip_config_id: &str) -> String {
    match ip_config_id.find("/ipConfigurations/") {
        Some(idx) => ip_config_id[..idx].to_string(),
        None => ip_config_id.to_string(),
    }
}

fn references_public_ip(load_balancer: &serde_json::Value, pip_id: &str) -> bool {
    load_balancer
        .pointer("/properties/frontendIPConfigurations")
        .and_then(|v| v.as_array())
        .map(|frontends| {
            frontends.iter().any(|frontend| {
                frontend
                    .pointer("/properties/publicIPAddress/id")
                    .and_then(|v| v.as_str())
                    .is_some_and(|fid| fid.eq_ignore_ascii_case(pip_id))
            })
        })
        .unwrap_or(false)
}

/// Remove every reference to the public IP from a NIC's ipConfigurations or
/// a load balancer's frontendIPConfigurations.
fn strip_public_ip_refs(body: &mut serde_json::Value, pip_id: &str) {
    for key in ["ipConfigurations", "frontendIPConfigurations"] {
        if let Some(configs) = body
            .pointer_mut(&format!("/properties/{}", key))
            .and_then(|v| v.as_array_mut())
        {
            for config in configs {
                let matches = config
                    .pointer("/properties/publicIPAddress/id")
                    .and_then(|v| v.as_str())
                    .is_some_and(|fid| fid.eq_ignore_ascii_case(pip_id));
                if matches {
                    if let Some(props) = config
                        .get_mut("properties")
                        .and_then(|v| v.as_object_mut())
                    {
                        props.remove("publicIPAddress");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIP_ID: &str =
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/ip1";

    #[test]
    fn nic_id_is_derived_from_ip_configuration_id() {
        let config_id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic1/ipConfigurations/ipconfig1";
        assert_eq!(
            owning_nic_id(config_id),
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic1"
        );
    }

    #[test]
    fn load_balancer_reference_detection_is_case_insensitive() {
        let lb = serde_json::json!({
            "id": "/lb1",
            "properties": {
                "frontendIPConfigurations": [
                    { "name": "fe1", "properties": { "publicIPAddress": { "id": PIP_ID.to_uppercase() } } }
                ]
            }
        });
        assert!(references_public_ip(&lb, PIP_ID));

        let other = serde_json::json!({
            "id": "/lb2",
            "properties": { "frontendIPConfigurations": [{ "name": "fe1", "properties": {} }] }
        });
        assert!(!references_public_ip(&other, PIP_ID));
    }

    #[test]
    fn stripping_removes_only_matching_references() {
        let mut nic = serde_json::json!({
            "properties": {
                "ipConfigurations": [
                    { "name": "a", "properties": { "publicIPAddress": { "id": PIP_ID } } },
                    { "name": "b", "properties": { "publicIPAddress": { "id": "/other" } } }
                ]
            }
        });

        strip_public_ip_refs(&mut nic, PIP_ID);

        let configs = nic["properties"]["ipConfigurations"].as_array().unwrap();
        assert!(configs[0]["properties"].get("publicIPAddress").is_none());
        assert_eq!(configs[1]["properties"]["publicIPAddress"]["id"], "/other");
    }
}
