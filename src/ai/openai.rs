//! Client for OpenAI-compatible chat completion endpoints (OpenAI, Azure
//! OpenAI behind a gateway, Ollama, LM Studio). Classification is advisory:
//! every failure surfaces as `ClassificationError` so callers can degrade
//! to rule-based results.

use crate::ai::prompts;
use crate::domain::model::{AiClassification, Resource, ScanKind};
use crate::domain::ports::Classifier;
use crate::utils::error::{OptimizerError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_MAX_TOKENS: u32 = 2000;

pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

impl OpenAiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Self::with_options(endpoint, api_key, model, DEFAULT_MAX_TOKENS, Duration::from_secs(120))
    }

    pub fn with_options(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        })
    }

    fn completions_url(&self) -> String {
        // 端點可能已含 /v1,不重複附加
        if self.endpoint.ends_with("/v1") {
            format!("{}/chat/completions", self.endpoint)
        } else {
            format!("{}/v1/chat/completions", self.endpoint)
        }
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompts::SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OptimizerError::ClassificationError {
                message: format!("chat completion request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(OptimizerError::ClassificationError {
                message: format!("chat completion returned {}: {}", status, detail),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| OptimizerError::ClassificationError {
                    message: format!("malformed chat completion response: {}", e),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OptimizerError::ClassificationError {
                message: "chat completion response contained no choices".to_string(),
            })
    }
}

/// Pull a JSON array out of a model answer. Strips markdown fences and, if
/// the answer is chatty, falls back to the first `[` .. last `]` span.
pub(crate) fn extract_json_array(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    let without_fence = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.strip_suffix("```").unwrap_or(rest)
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest)
    } else {
        trimmed
    };
    let without_fence = without_fence.trim();

    if without_fence.starts_with('[') && without_fence.ends_with(']') {
        return Some(without_fence);
    }

    let start = without_fence.find('[')?;
    let end = without_fence.rfind(']')?;
    if end > start {
        Some(&without_fence[start..=end])
    } else {
        None
    }
}

fn parse_classifications(content: &str) -> Result<Vec<AiClassification>> {
    let json = extract_json_array(content).ok_or_else(|| OptimizerError::ClassificationError {
        message: format!("model answer contained no JSON array: {}", truncate(content, 200)),
    })?;

    serde_json::from_str(json).map_err(|e| OptimizerError::ClassificationError {
        message: format!("model answer was not a valid classification array: {}", e),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl Classifier for OpenAiClient {
    async fn classify(
        &self,
        kind: ScanKind,
        resources: &[Resource],
    ) -> Result<Vec<AiClassification>> {
        if resources.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = prompts::classification_prompt(kind, resources);
        tracing::debug!(
            "🤖 Requesting {} classification for {} resources via {}",
            kind.as_str(),
            resources.len(),
            self.model
        );

        let answer = self.chat(&prompt).await?;
        let classifications = parse_classifications(&answer)?;

        tracing::info!(
            "✅ AI classified {} of {} resources",
            classifications.len(),
            resources.len()
        );
        Ok(classifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn disk() -> Resource {
        serde_json::from_value(serde_json::json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/d1",
            "name": "d1",
            "type": "microsoft.compute/disks",
            "properties": { "managedBy": "" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn classify_posts_chat_completion_and_parses_array() {
        let server = MockServer::start();
        let chat_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body_partial(r#"{ "model": "gpt-4o", "temperature": 0 }"#);
            then.status(200).json_body(serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "[{\"id\": \"/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/d1\", \"reason\": \"unattached\", \"recommendation\": \"delete\"}]"
                    }
                }]
            }));
        });

        let client = OpenAiClient::new(server.base_url(), "sk-test", "gpt-4o").unwrap();
        let result = client.classify(ScanKind::Orphaned, &[disk()]).await.unwrap();

        chat_mock.assert();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].reason.as_deref(), Some("unattached"));
    }

    #[tokio::test]
    async fn classify_strips_markdown_fences() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "```json\n[{\"id\": \"/x\", \"reason\": \"old sku\"}]\n```"
                    }
                }]
            }));
        });

        let client = OpenAiClient::new(server.base_url(), "k", "m").unwrap();
        let result = client.classify(ScanKind::Deprecated, &[disk()]).await.unwrap();
        assert_eq!(result[0].reason.as_deref(), Some("old sku"));
    }

    #[tokio::test]
    async fn classify_surfaces_http_errors_as_classification_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).body("upstream exploded");
        });

        let client = OpenAiClient::new(server.base_url(), "k", "m").unwrap();
        let err = client.classify(ScanKind::Orphaned, &[disk()]).await.unwrap_err();

        match err {
            OptimizerError::ClassificationError { message } => {
                assert!(message.contains("500"));
            }
            other => panic!("expected ClassificationError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn classify_rejects_non_json_answers() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "I cannot help with that." } }]
            }));
        });

        let client = OpenAiClient::new(server.base_url(), "k", "m").unwrap();
        let err = client.classify(ScanKind::Orphaned, &[disk()]).await.unwrap_err();
        assert!(matches!(err, OptimizerError::ClassificationError { .. }));
    }

    #[tokio::test]
    async fn classify_skips_request_for_empty_input() {
        let server = MockServer::start();
        let chat_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200);
        });

        let client = OpenAiClient::new(server.base_url(), "k", "m").unwrap();
        let result = client.classify(ScanKind::Orphaned, &[]).await.unwrap();

        assert!(result.is_empty());
        chat_mock.assert_hits(0);
    }

    #[test]
    fn json_extraction_handles_chatty_answers() {
        let chatty = "Sure! Here are the findings:\n[{\"id\": \"/x\"}]\nLet me know if you need more.";
        assert_eq!(extract_json_array(chatty), Some("[{\"id\": \"/x\"}]"));
        assert_eq!(extract_json_array("[]"), Some("[]"));
        assert!(extract_json_array("no array here").is_none());
    }

    #[test]
    fn endpoint_with_v1_suffix_is_not_doubled() {
        let client = OpenAiClient::new("http://localhost:11434/v1", "k", "llama3").unwrap();
        assert_eq!(
            client.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }
}
