use crate::domain::model::{AiClassification, Resource, ScanKind, Subscription};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Where reports end up. Kept narrow so tests can capture output in memory.
pub trait ReportSink: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Azure Resource Graph: run a KQL query against a set of subscriptions.
#[async_trait]
pub trait ResourceGraph: Send + Sync {
    async fn query(&self, query: &str, subscriptions: &[String]) -> Result<Vec<Resource>>;
}

/// Generic Azure Resource Manager operations. Object-safe because the
/// upgrade agents hold it behind a reference.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    async fn get_resource(&self, id: &str, api_version: &str) -> Result<serde_json::Value>;

    async fn put_resource(
        &self,
        id: &str,
        api_version: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value>;

    async fn delete_resource(&self, id: &str, api_version: &str) -> Result<()>;

    /// GET a collection path and return the `value` array.
    async fn list_resources(
        &self,
        collection_path: &str,
        api_version: &str,
    ) -> Result<Vec<serde_json::Value>>;

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>>;
}

/// LLM-backed classification of scan hits.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        kind: ScanKind,
        resources: &[Resource],
    ) -> Result<Vec<AiClassification>>;
}
