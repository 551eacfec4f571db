use crate::azure::{retry_after_secs, RetryPolicy};
use crate::domain::model::Subscription;
use crate::domain::ports::ResourceManager;
use crate::utils::error::{OptimizerError, Result};
use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";

/// Api-versions the agents use for generic resource operations. Mirrors the
/// versions the portal automation paths pin.
pub mod api_versions {
    pub const GENERIC: &str = "2021-04-01";
    pub const DELETE: &str = "2022-09-01";
    pub const NETWORK: &str = "2023-09-01";
    pub const STORAGE: &str = "2023-01-01";
}

/// Generic client against Azure Resource Manager. Every operation addresses
/// a resource by its full id; typed SDK models are deliberately avoided.
pub struct ArmClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    retry: RetryPolicy,
}

impl ArmClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::with_options(endpoint, token, Duration::from_secs(60), RetryPolicy::default())
    }

    pub fn with_options(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry,
        })
    }

    fn url_for(&self, id: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, id, api_version)
    }

    async fn send(
        &self,
        method: Method,
        id: &str,
        api_version: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = self.url_for(id, api_version);

        let mut attempt = 0u32;
        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if RetryPolicy::is_retryable(status) && attempt < self.retry.attempts {
                let delay = self.retry.delay_for(attempt, retry_after_secs(&response));
                tracing::warn!(
                    "⏳ ARM returned {} for {}, retrying in {:?} (attempt {}/{})",
                    status,
                    id,
                    delay,
                    attempt + 1,
                    self.retry.attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let message = response.text().await.unwrap_or_default();
            return Err(OptimizerError::ArmError {
                status: status.as_u16(),
                resource_id: id.to_string(),
                message,
            });
        }
    }
}

#[async_trait]
impl ResourceManager for ArmClient {
    async fn get_resource(&self, id: &str, api_version: &str) -> Result<serde_json::Value> {
        let response = self.send(Method::GET, id, api_version, None).await?;
        Ok(response.json().await?)
    }

    async fn put_resource(
        &self,
        id: &str,
        api_version: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let response = self.send(Method::PUT, id, api_version, Some(body)).await?;
        Ok(response.json().await?)
    }

    async fn delete_resource(&self, id: &str, api_version: &str) -> Result<()> {
        // 202 表示非同步刪除已受理，也視為成功
        self.send(Method::DELETE, id, api_version, None).await?;
        Ok(())
    }

    async fn list_resources(
        &self,
        collection_path: &str,
        api_version: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let response = self.send(Method::GET, collection_path, api_version, None).await?;
        let body: serde_json::Value = response.json().await?;
        Ok(body
            .get("value")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        let response = self
            .send(Method::GET, "/subscriptions", SUBSCRIPTIONS_API_VERSION, None)
            .await?;
        let body: serde_json::Value = response.json().await?;
        let subscriptions = body
            .get("value")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();
        Ok(subscriptions)
    }
}
