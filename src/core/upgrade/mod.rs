//! Upgrade orchestration: route each resource id to the agent for its type
//! and process the batch in dependency order. Public IPs go first because
//! Standard load balancers require Standard frontends.

pub mod load_balancer;
pub mod public_ip;
pub mod storage_account;

use crate::domain::model::{UpgradeOutcome, UpgradeReport};
use crate::domain::ports::ResourceManager;
use crate::domain::resource_id::ResourceId;
use std::time::Duration;

pub use load_balancer::LoadBalancerUpgradeAgent;
pub use public_ip::PublicIpUpgradeAgent;
pub use storage_account::StorageAccountUpgradeAgent;

pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(2);

pub struct UpgradeOrchestrator<'a> {
    arm: &'a dyn ResourceManager,
    throttle: Duration,
}

impl<'a> UpgradeOrchestrator<'a> {
    pub fn new(arm: &'a dyn ResourceManager) -> Self {
        Self {
            arm,
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub async fn upgrade_resources(&self, ids: &[String]) -> UpgradeReport {
        let mut results = Vec::with_capacity(ids.len());

        // 無效 id 先記為失敗,其餘依相依順序排序
        let mut parsed: Vec<ResourceId> = Vec::new();
        for id in ids {
            match ResourceId::parse(id) {
                Ok(resource_id) => parsed.push(resource_id),
                Err(e) => {
                    tracing::error!("❌ Skipping invalid resource id {}: {}", id, e);
                    results.push(UpgradeOutcome::failure(id, e.to_string()));
                }
            }
        }
        parsed.sort_by_key(dependency_rank);

        let total = parsed.len();
        for (index, resource_id) in parsed.iter().enumerate() {
            tracing::info!(
                "🔧 Upgrading {} ({}/{})",
                resource_id,
                index + 1,
                total
            );
            results.push(self.upgrade_one(resource_id).await);

            if index + 1 < total && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
        }

        let successful = results.iter().filter(|r| r.success && !r.skipped).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let failed = results.len() - successful - skipped;
        tracing::info!(
            "📊 Upgrade batch finished: {} ok, {} skipped, {} failed",
            successful,
            skipped,
            failed
        );

        UpgradeReport {
            success: failed == 0,
            total_resources: results.len(),
            successful_upgrades: successful,
            failed_upgrades: failed,
            skipped_upgrades: skipped,
            individual_results: results,
        }
    }

    async fn upgrade_one(&self, resource_id: &ResourceId) -> UpgradeOutcome {
        match resource_id.qualified_type().to_ascii_lowercase().as_str() {
            "microsoft.network/publicipaddresses" => {
                PublicIpUpgradeAgent::new(self.arm).upgrade(resource_id).await
            }
            "microsoft.storage/storageaccounts" => {
                StorageAccountUpgradeAgent::new(self.arm)
                    .upgrade(resource_id)
                    .await
            }
            "microsoft.network/loadbalancers" => {
                LoadBalancerUpgradeAgent::new(self.arm)
                    .upgrade(resource_id)
                    .await
            }
            other => UpgradeOutcome::failure(
                resource_id.to_string(),
                format!("No upgrade path for resource type {}", other),
            ),
        }
    }
}

/// Batch ordering: Public IPs before storage accounts before load balancers.
fn dependency_rank(resource_id: &ResourceId) -> u8 {
    match resource_id.qualified_type().to_ascii_lowercase().as_str() {
        "microsoft.network/publicipaddresses" => 1,
        "microsoft.storage/storageaccounts" => 2,
        "microsoft.network/loadbalancers" => 3,
        _ => 4,
    }
}
