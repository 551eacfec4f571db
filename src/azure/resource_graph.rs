use crate::azure::{retry_after_secs, RetryPolicy};
use crate::domain::model::Resource;
use crate::domain::ports::ResourceGraph;
use crate::utils::error::{OptimizerError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const API_VERSION: &str = "2021-03-01";

/// Client for the Azure Resource Graph query endpoint
/// (`POST /providers/Microsoft.ResourceGraph/resources`).
pub struct ResourceGraphClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(rename = "$skipToken", default)]
    skip_token: Option<String>,
}

impl ResourceGraphClient {
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

    async fn query_page(
        &self,
        query: &str,
        subscriptions: &[String],
        skip_token: Option<&str>,
    ) -> Result<QueryResponse> {
        let url = format!(
            "{}/providers/Microsoft.ResourceGraph/resources?api-version={}",
            self.endpoint, API_VERSION
        );

        let mut body = serde_json::json!({
            "query": query,
            "subscriptions": subscriptions,
        });
        if let Some(token) = skip_token {
            body["options"] = serde_json::json!({ "$skipToken": token });
        }

        let mut attempt = 0u32;
        loop {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response.json().await?);
            }

            if RetryPolicy::is_retryable(status) && attempt < self.retry.attempts {
                let delay = self.retry.delay_for(attempt, retry_after_secs(&response));
                tracing::warn!(
                    "⏳ Resource Graph returned {}, retrying in {:?} (attempt {}/{})",
                    status,
                    delay,
                    attempt + 1,
                    self.retry.attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let message = response.text().await.unwrap_or_default();
            return Err(OptimizerError::GraphQueryError {
                status: status.as_u16(),
                message,
            });
        }
    }
}

#[async_trait]
impl ResourceGraph for ResourceGraphClient {
    async fn query(&self, query: &str, subscriptions: &[String]) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut skip_token: Option<String> = None;

        // 依 $skipToken 翻頁直到取完
        loop {
            let page = self
                .query_page(query, subscriptions, skip_token.as_deref())
                .await?;

            for row in page.data {
                match serde_json::from_value::<Resource>(row) {
                    Ok(resource) => resources.push(resource),
                    Err(e) => tracing::warn!("Skipping unparseable graph row: {}", e),
                }
            }

            match page.skip_token {
                Some(token) => skip_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Resource Graph query returned {} rows", resources.len());
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> ResourceGraphClient {
        ResourceGraphClient::with_options(
            server.base_url(),
            "test-token",
            Duration::from_secs(5),
            RetryPolicy::new(2, Duration::from_millis(10)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn query_sends_subscriptions_and_parses_rows() {
        let server = MockServer::start();
        let graph_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/providers/Microsoft.ResourceGraph/resources")
                .query_param("api-version", API_VERSION)
                .header("authorization", "Bearer test-token")
                .json_body_partial(r#"{ "subscriptions": ["sub-1"] }"#);
            then.status(200).json_body(serde_json::json!({
                "totalRecords": 1,
                "count": 1,
                "data": [{
                    "id": "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/disks/d1",
                    "name": "d1",
                    "type": "microsoft.compute/disks",
                    "resourceGroup": "rg",
                    "location": "westeurope"
                }]
            }));
        });

        let client = client_for(&server);
        let resources = client
            .query("Resources | limit 1", &["sub-1".to_string()])
            .await
            .unwrap();

        graph_mock.assert();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "d1");
    }

    #[tokio::test]
    async fn query_follows_skip_token() {
        let server = MockServer::start();

        // serde_json 物件鍵值排序固定，可用完整 body 精確匹配區分兩頁
        let first_page = server.mock(|when, then| {
            when.method(POST)
                .path("/providers/Microsoft.ResourceGraph/resources")
                .body(r#"{"query":"Resources","subscriptions":["s"]}"#);
            then.status(200).json_body(serde_json::json!({
                "data": [{ "id": "/subscriptions/s/resourceGroups/rg/providers/p/t/one", "name": "one" }],
                "$skipToken": "page2"
            }));
        });

        let second_page = server.mock(|when, then| {
            when.method(POST)
                .path("/providers/Microsoft.ResourceGraph/resources")
                .body(r#"{"options":{"$skipToken":"page2"},"query":"Resources","subscriptions":["s"]}"#);
            then.status(200).json_body(serde_json::json!({
                "data": [{ "id": "/subscriptions/s/resourceGroups/rg/providers/p/t/two", "name": "two" }]
            }));
        });

        let client = client_for(&server);
        let resources = client.query("Resources", &["s".to_string()]).await.unwrap();

        first_page.assert();
        second_page.assert();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[1].name, "two");
    }

    #[tokio::test]
    async fn query_retries_on_throttling() {
        let server = MockServer::start();

        // httpmock 依序比對，先回 429 一次再成功
        let throttled = server.mock(|when, then| {
            when.method(POST)
                .path("/providers/Microsoft.ResourceGraph/resources");
            then.status(429)
                .header("Retry-After", "0")
                .body("too many requests");
        });

        let client = client_for(&server);
        let result = client.query("Resources", &["s".to_string()]).await;

        // 全部嘗試都吃到 429 時回報 GraphQueryError
        assert!(throttled.hits() >= 2);
        match result {
            Err(OptimizerError::GraphQueryError { status, .. }) => assert_eq!(status, 429),
            other => panic!("expected GraphQueryError, got {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn query_fails_fast_on_auth_errors() {
        let server = MockServer::start();
        let denied = server.mock(|when, then| {
            when.method(POST)
                .path("/providers/Microsoft.ResourceGraph/resources");
            then.status(401).body("token expired");
        });

        let client = client_for(&server);
        let result = client.query("Resources", &["s".to_string()]).await;

        denied.assert_hits(1);
        match result {
            Err(OptimizerError::GraphQueryError { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("token expired"));
            }
            other => panic!("expected GraphQueryError, got {:?}", other.map(|r| r.len())),
        }
    }
}
