//! Scan orchestration: run the knowledge-base query against Resource Graph,
//! annotate every hit with the matching rule, and optionally let an LLM
//! refine the reasoning. AI failure never fails a scan.

use crate::ai::knowledge_base::KnowledgeBase;
use crate::domain::model::{Finding, FindingSource, Priority, Resource, ScanKind, ScanReport};
use crate::domain::ports::{Classifier, ResourceGraph};
use crate::utils::error::Result;
use chrono::Utc;

const DEFAULT_LIMIT: usize = 200;

pub struct Scanner<G> {
    graph: G,
    classifier: Option<Box<dyn Classifier>>,
    knowledge_base: KnowledgeBase,
    limit: usize,
}

impl<G: ResourceGraph> Scanner<G> {
    pub fn new(graph: G) -> Self {
        Self {
            graph,
            classifier: None,
            knowledge_base: KnowledgeBase::new(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub async fn scan(&self, kind: ScanKind, subscriptions: &[String]) -> Result<ScanReport> {
        let query = self.knowledge_base.scan_query(kind, self.limit);
        tracing::info!(
            "🔍 Scanning {} subscription(s) for {} resources",
            subscriptions.len(),
            kind.as_str()
        );

        let resources = self.graph.query(&query, subscriptions).await?;
        let mut findings: Vec<Finding> = resources
            .iter()
            .map(|resource| self.annotate(kind, resource))
            .collect();

        let (ai_used, message) = match &self.classifier {
            Some(classifier) if !resources.is_empty() => {
                match classifier.classify(kind, &resources).await {
                    Ok(classifications) => {
                        let refined = merge_classifications(&mut findings, &classifications);
                        (true, format!("AI refined {} of {} findings", refined, findings.len()))
                    }
                    Err(e) => {
                        // AI 失敗時降級為純規則結果,不讓掃描失敗
                        tracing::warn!("❌ AI classification unavailable, using rule-based results: {}", e);
                        (false, format!("AI classification unavailable ({}), rule-based results only", e))
                    }
                }
            }
            Some(_) => (false, "No resources to classify".to_string()),
            None => (false, "Rule-based scan (AI disabled)".to_string()),
        };

        tracing::info!("✅ Scan complete: {} {} finding(s)", findings.len(), kind.as_str());

        Ok(ScanReport {
            kind,
            total: findings.len(),
            findings,
            scanned_at: Utc::now(),
            ai_used,
            message,
        })
    }

    fn annotate(&self, kind: ScanKind, resource: &Resource) -> Finding {
        match self.knowledge_base.match_resource(kind, resource) {
            Some(pattern) => Finding {
                resource: resource.clone(),
                issue: pattern.description.to_string(),
                reason: pattern.impact.to_string(),
                recommendation: pattern.recommendation.to_string(),
                priority: pattern.priority,
                estimated_monthly_cost: self.knowledge_base.monthly_cost_estimate(resource),
                source: FindingSource::KnowledgeBase,
            },
            // 查詢命中但規則未覆蓋的型別,保留為一般性發現
            None => Finding {
                resource: resource.clone(),
                issue: format!("Flagged by {} scan query", kind.as_str()),
                reason: "Matched the scan query but no specific rule applies".to_string(),
                recommendation: "Review the resource configuration manually".to_string(),
                priority: Priority::Medium,
                estimated_monthly_cost: self.knowledge_base.monthly_cost_estimate(resource),
                source: FindingSource::KnowledgeBase,
            },
        }
    }
}

/// Overlay AI reasoning onto the rule-based findings, matched by resource id.
/// Returns how many findings were refined.
fn merge_classifications(
    findings: &mut [Finding],
    classifications: &[crate::domain::model::AiClassification],
) -> usize {
    let mut refined = 0;
    for finding in findings.iter_mut() {
        let matched = classifications
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(&finding.resource.id));
        if let Some(classification) = matched {
            if let Some(reason) = &classification.reason {
                finding.reason = reason.clone();
            }
            if let Some(recommendation) = &classification.recommendation {
                finding.recommendation = recommendation.clone();
            }
            finding.source = FindingSource::Ai;
            refined += 1;
        }
    }
    refined
}
