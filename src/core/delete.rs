//! Batch deletion. Items are processed sequentially with a throttle delay
//! so the subscription does not hit ARM rate limits; one failed delete never
//! aborts the batch.

use crate::azure::arm::api_versions;
use crate::domain::model::{DeleteOutcome, DeleteReport};
use crate::domain::ports::ResourceManager;
use std::time::Duration;

pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(2);

pub struct DeleteBatch<'a> {
    arm: &'a dyn ResourceManager,
    throttle: Duration,
}

impl<'a> DeleteBatch<'a> {
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

    pub async fn delete_resources(&self, ids: &[String]) -> DeleteReport {
        let mut deleted = Vec::with_capacity(ids.len());

        for (index, id) in ids.iter().enumerate() {
            tracing::info!("🗑️ Deleting {} ({}/{})", id, index + 1, ids.len());

            let outcome = match self.arm.delete_resource(id, api_versions::DELETE).await {
                Ok(()) => {
                    tracing::info!("✅ Deleted {}", id);
                    DeleteOutcome {
                        id: id.clone(),
                        success: true,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!("❌ Failed to delete {}: {}", id, e);
                    DeleteOutcome {
                        id: id.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            deleted.push(outcome);

            // 批次節流,最後一筆不需等待
            if index + 1 < ids.len() && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
        }

        let succeeded = deleted.iter().filter(|o| o.success).count();
        let failed = deleted.len() - succeeded;
        tracing::info!("📊 Delete batch finished: {} ok, {} failed", succeeded, failed);

        DeleteReport {
            deleted,
            succeeded,
            failed,
        }
    }
}
