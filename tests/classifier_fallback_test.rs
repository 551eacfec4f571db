use anyhow::Result;
use httpmock::prelude::*;
use std::time::Duration;
use tenant_optimizer::azure::RetryPolicy;
use tenant_optimizer::domain::model::{FindingSource, ScanKind};
use tenant_optimizer::{OpenAiClient, ResourceGraphClient, Scanner};

const DISK_ID: &str =
    "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/disks/old-disk";

fn mock_graph_with_one_disk(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/providers/Microsoft.ResourceGraph/resources");
        then.status(200).json_body(serde_json::json!({
            "data": [{
                "id": DISK_ID,
                "name": "old-disk",
                "type": "microsoft.compute/disks",
                "properties": { "managedBy": "", "diskSizeGB": 64 }
            }]
        }));
    });
}

fn scanner_with_ai(server: &MockServer) -> Result<Scanner<ResourceGraphClient>> {
    let graph = ResourceGraphClient::with_options(
        server.base_url(),
        "azure-token",
        Duration::from_secs(5),
        RetryPolicy::new(1, Duration::from_millis(10)),
    )?;
    let classifier = OpenAiClient::with_options(
        server.base_url(),
        "sk-test",
        "gpt-4o",
        2000,
        Duration::from_secs(5),
    )?;
    Ok(Scanner::new(graph).with_classifier(Box::new(classifier)))
}

/// AI 成功時覆寫原因與建議
#[tokio::test]
async fn test_ai_classification_refines_findings() -> Result<()> {
    let server = MockServer::start();
    mock_graph_with_one_disk(&server);

    let chat_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": format!(
                        "[{{\"id\": \"{}\", \"reason\": \"Unattached for 90 days\", \"recommendation\": \"Snapshot then delete\"}}]",
                        DISK_ID
                    )
                }
            }]
        }));
    });

    let report = scanner_with_ai(&server)?
        .scan(ScanKind::Orphaned, &["sub-1".to_string()])
        .await?;

    chat_mock.assert();
    assert!(report.ai_used);
    let finding = &report.findings[0];
    assert_eq!(finding.source, FindingSource::Ai);
    assert_eq!(finding.reason, "Unattached for 90 days");

    Ok(())
}

/// AI 掛掉時降級為知識庫結果,掃描仍然成功
#[tokio::test]
async fn test_scan_survives_ai_outage() -> Result<()> {
    let server = MockServer::start();
    mock_graph_with_one_disk(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(503).body("model overloaded");
    });

    let report = scanner_with_ai(&server)?
        .scan(ScanKind::Orphaned, &["sub-1".to_string()])
        .await?;

    assert!(!report.ai_used);
    assert_eq!(report.total, 1);
    assert_eq!(report.findings[0].source, FindingSource::KnowledgeBase);
    assert!(report.message.contains("rule-based"));

    Ok(())
}

/// 模型回傳散文而非 JSON 時同樣降級
#[tokio::test]
async fn test_scan_survives_prose_answers() -> Result<()> {
    let server = MockServer::start();
    mock_graph_with_one_disk(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(serde_json::json!({
            "choices": [{
                "message": { "role": "assistant", "content": "These resources look unused to me." }
            }]
        }));
    });

    let report = scanner_with_ai(&server)?
        .scan(ScanKind::Orphaned, &["sub-1".to_string()])
        .await?;

    assert!(!report.ai_used);
    assert_eq!(report.findings[0].source, FindingSource::KnowledgeBase);

    Ok(())
}
