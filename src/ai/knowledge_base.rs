//! Curated catalog of Azure deprecation and orphaned-resource patterns,
//! based on Microsoft Learn lifecycle documentation and the official
//! retirement announcements (Basic SKU Public IP / Load Balancer and
//! unmanaged disks retire September 30, 2025).
//!
//! The catalog drives three things: the Resource Graph queries a scan runs,
//! the rule-based annotation of each hit, and the upgrade guidance returned
//! for actionable resource types.

use crate::domain::model::{Priority, Resource, ScanKind};
use serde::Serialize;

/// How a single rule inspects one property of the resource payload.
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(&'static [&'static str]),
    StartsWith(&'static [&'static str]),
    IsNullOrEmpty,
    IsEmptyArray,
}

#[derive(Debug, Clone)]
pub struct DetectionRule {
    /// Dot path into the serialized resource, e.g. `properties.sku.name`.
    pub property: &'static str,
    pub matcher: Matcher,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub key: &'static str,
    pub kind: ScanKind,
    pub resource_types: &'static [&'static str],
    pub rules: Vec<DetectionRule>,
    /// NSG-style patterns need every rule to hold; SKU patterns need any.
    pub match_all: bool,
    pub description: &'static str,
    pub impact: &'static str,
    pub recommendation: &'static str,
    pub retirement_date: Option<&'static str>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpgradeGuidance {
    pub title: String,
    pub urgency: String,
    pub steps: Vec<String>,
    pub considerations: Vec<String>,
    pub documentation: String,
}

pub struct KnowledgeBase {
    patterns: Vec<Pattern>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self {
            patterns: build_patterns(),
        }
    }

    pub fn patterns(&self, kind: ScanKind) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter().filter(move |p| p.kind == kind)
    }

    /// First pattern of the given kind that matches the resource.
    pub fn match_resource(&self, kind: ScanKind, resource: &Resource) -> Option<&Pattern> {
        let value = serde_json::to_value(resource).ok()?;
        let resource_type = resource.resource_type.to_ascii_lowercase();

        self.patterns(kind).find(|pattern| {
            pattern
                .resource_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&resource_type))
                && evaluate_rules(&pattern.rules, pattern.match_all, &value)
        })
    }

    /// The scan query for a kind, ported from the comprehensive KQL set.
    pub fn scan_query(&self, kind: ScanKind, limit: usize) -> String {
        let base = match kind {
            ScanKind::Orphaned => ORPHANED_QUERY,
            ScanKind::Deprecated => DEPRECATED_QUERY,
        };
        format!("{}\n| limit {}", base.trim_end(), limit)
    }

    /// Rough monthly cost of keeping the resource around, in USD.
    pub fn monthly_cost_estimate(&self, resource: &Resource) -> Option<f64> {
        let resource_type = resource.resource_type.to_ascii_lowercase();
        match resource_type.as_str() {
            "microsoft.compute/disks" => {
                let size_gb = resource
                    .properties
                    .get("diskSizeGB")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0);
                Some(size_gb * 0.05)
            }
            "microsoft.network/publicipaddresses" => {
                let allocation = resource
                    .properties
                    .get("publicIPAllocationMethod")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                if allocation.eq_ignore_ascii_case("static") {
                    Some(3.65)
                } else {
                    Some(0.0)
                }
            }
            _ => None,
        }
    }

    /// Migration guidance for the resource types we know how to upgrade.
    pub fn upgrade_guidance(&self, qualified_type: &str) -> UpgradeGuidance {
        match qualified_type.to_ascii_lowercase().as_str() {
            "microsoft.network/publicipaddresses" => UpgradeGuidance {
                title: "Upgrade Basic to Standard SKU Public IP".to_string(),
                urgency: "High - Retirement September 30, 2025".to_string(),
                steps: vec![
                    "Review associated resources (VMs, Load Balancers, etc.)".to_string(),
                    "Plan maintenance window as upgrade causes temporary downtime".to_string(),
                    "Dissociate Public IP from associated resources".to_string(),
                    "Change SKU from Basic to Standard".to_string(),
                    "Re-associate with original resources".to_string(),
                    "Test connectivity and update any automation".to_string(),
                ],
                considerations: vec![
                    "Standard SKU has different pricing model".to_string(),
                    "Standard SKU provides better SLA and features".to_string(),
                    "Static allocation becomes default for Standard SKU".to_string(),
                ],
                documentation: "https://learn.microsoft.com/en-us/azure/virtual-network/ip-services/public-ip-basic-upgrade-guidance".to_string(),
            },
            "microsoft.network/loadbalancers" => UpgradeGuidance {
                title: "Upgrade Basic to Standard SKU Load Balancer".to_string(),
                urgency: "High - Retirement September 30, 2025".to_string(),
                steps: vec![
                    "Document current configuration and backend pools".to_string(),
                    "Plan maintenance window".to_string(),
                    "Upgrade frontend Public IPs to Standard SKU first".to_string(),
                    "Update SKU and validate health probes and rules".to_string(),
                    "Test functionality before closing the maintenance window".to_string(),
                ],
                considerations: vec![
                    "Standard Load Balancer supports availability zones".to_string(),
                    "Different pricing model and enhanced features".to_string(),
                    "May require Standard SKU Public IPs".to_string(),
                ],
                documentation: "https://learn.microsoft.com/en-us/azure/load-balancer/load-balancer-basic-upgrade-guidance".to_string(),
            },
            "microsoft.storage/storageaccounts" => UpgradeGuidance {
                title: "Optimize Storage Account Configuration".to_string(),
                urgency: "Medium - Cost and durability optimization".to_string(),
                steps: vec![
                    "Analyze access patterns and performance requirements".to_string(),
                    "Evaluate replication needs for your data".to_string(),
                    "Plan replication type change during maintenance window".to_string(),
                    "Update storage account replication type".to_string(),
                    "Monitor performance and costs after change".to_string(),
                ],
                considerations: vec![
                    "GRS provides geo-redundancy across regions".to_string(),
                    "ZRS provides zone redundancy within region".to_string(),
                    "Consider read-access versions (RA-GRS, RA-GZRS) if needed".to_string(),
                ],
                documentation: "https://learn.microsoft.com/en-us/azure/storage/common/storage-redundancy".to_string(),
            },
            _ => UpgradeGuidance {
                title: "Review Resource Configuration".to_string(),
                urgency: "Medium".to_string(),
                steps: vec![
                    "Review current configuration".to_string(),
                    "Consult Azure documentation".to_string(),
                    "Plan optimization".to_string(),
                ],
                considerations: vec!["Follow Microsoft best practices".to_string()],
                documentation: "https://learn.microsoft.com/en-us/azure/".to_string(),
            },
        }
    }
}

fn evaluate_rules(rules: &[DetectionRule], match_all: bool, value: &serde_json::Value) -> bool {
    if match_all {
        rules.iter().all(|rule| evaluate_rule(rule, value))
    } else {
        rules.iter().any(|rule| evaluate_rule(rule, value))
    }
}

fn evaluate_rule(rule: &DetectionRule, value: &serde_json::Value) -> bool {
    let target = lookup_path(value, rule.property);
    match &rule.matcher {
        Matcher::Exact(candidates) => target
            .and_then(|v| v.as_str())
            .map(|s| candidates.iter().any(|c| c.eq_ignore_ascii_case(s)))
            .unwrap_or(false),
        Matcher::StartsWith(prefixes) => target
            .and_then(|v| v.as_str())
            .map(|s| {
                let lower = s.to_ascii_lowercase();
                prefixes.iter().any(|p| lower.starts_with(&p.to_ascii_lowercase()))
            })
            .unwrap_or(false),
        Matcher::IsNullOrEmpty => match target {
            None => true,
            Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.is_empty(),
            Some(_) => false,
        },
        Matcher::IsEmptyArray => match target {
            None => true,
            Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        },
    }
}

fn lookup_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn build_patterns() -> Vec<Pattern> {
    vec![
        // 2025-09-30 退役項目
        Pattern {
            key: "public_ip_basic",
            kind: ScanKind::Deprecated,
            resource_types: &["microsoft.network/publicipaddresses"],
            rules: vec![
                DetectionRule { property: "properties.sku.name", matcher: Matcher::Exact(&["Basic"]) },
                DetectionRule { property: "properties.sku.tier", matcher: Matcher::Exact(&["Basic"]) },
                DetectionRule { property: "sku.name", matcher: Matcher::Exact(&["Basic"]) },
                DetectionRule { property: "sku.tier", matcher: Matcher::Exact(&["Basic"]) },
            ],
            match_all: false,
            description: "Basic SKU Public IP Addresses will be retired September 30, 2025",
            impact: "High - No new Basic Public IPs can be created after March 31, 2025",
            recommendation: "Upgrade to Standard SKU Public IP for better performance and availability",
            retirement_date: Some("2025-09-30"),
            priority: Priority::High,
        },
        Pattern {
            key: "load_balancer_basic",
            kind: ScanKind::Deprecated,
            resource_types: &["microsoft.network/loadbalancers"],
            rules: vec![
                DetectionRule { property: "properties.sku.name", matcher: Matcher::Exact(&["Basic"]) },
                DetectionRule { property: "properties.sku.tier", matcher: Matcher::Exact(&["Basic"]) },
                DetectionRule { property: "sku.name", matcher: Matcher::Exact(&["Basic"]) },
                DetectionRule { property: "sku.tier", matcher: Matcher::Exact(&["Basic"]) },
            ],
            match_all: false,
            description: "Basic SKU Load Balancers will be retired September 30, 2025",
            impact: "High - No new Basic Load Balancers can be created after March 31, 2025",
            recommendation: "Upgrade to Standard SKU Load Balancer for improved features and SLA",
            retirement_date: Some("2025-09-30"),
            priority: Priority::High,
        },
        Pattern {
            key: "unmanaged_disks",
            kind: ScanKind::Deprecated,
            resource_types: &["microsoft.compute/disks"],
            rules: vec![DetectionRule {
                property: "properties.diskProperties.diskType",
                matcher: Matcher::Exact(&["Unmanaged"]),
            }],
            match_all: false,
            description: "Azure Unmanaged Disks will be retired September 30, 2025",
            impact: "High - Migration to Managed Disks required",
            recommendation: "Migrate to Azure Managed Disks for better reliability and management",
            retirement_date: Some("2025-09-30"),
            priority: Priority::High,
        },
        // 儲存體最佳化
        Pattern {
            key: "standard_lrs",
            kind: ScanKind::Deprecated,
            resource_types: &["microsoft.storage/storageaccounts"],
            rules: vec![
                DetectionRule { property: "properties.sku.name", matcher: Matcher::Exact(&["Standard_LRS"]) },
                DetectionRule { property: "sku.name", matcher: Matcher::Exact(&["Standard_LRS"]) },
            ],
            match_all: false,
            description: "Standard_LRS provides limited redundancy",
            impact: "Medium - Single datacenter failure risk",
            recommendation: "Consider upgrading to GRS or ZRS for better data durability",
            retirement_date: None,
            priority: Priority::Medium,
        },
        Pattern {
            key: "archive_tier",
            kind: ScanKind::Deprecated,
            resource_types: &["microsoft.storage/storageaccounts"],
            rules: vec![DetectionRule {
                property: "properties.accessTier",
                matcher: Matcher::Exact(&["Archive"]),
            }],
            match_all: false,
            description: "Archive tier has high access costs and long retrieval times",
            impact: "Medium - Review access patterns for cost optimization",
            recommendation: "Review access patterns and consider Hot/Cool tiers for frequently accessed data",
            retirement_date: None,
            priority: Priority::Medium,
        },
        // 舊世代 VM
        Pattern {
            key: "a_series_deprecated",
            kind: ScanKind::Deprecated,
            resource_types: &["microsoft.compute/virtualmachines"],
            rules: vec![DetectionRule {
                property: "properties.hardwareProfile.vmSize",
                matcher: Matcher::StartsWith(&["Standard_A", "Basic_A"]),
            }],
            match_all: false,
            description: "A-Series VMs are older generation with limited performance",
            impact: "Medium - Performance and cost optimization opportunity",
            recommendation: "Upgrade to newer generation VM sizes (D, E, F series) for better performance and cost efficiency",
            retirement_date: None,
            priority: Priority::Medium,
        },
        // 孤兒資源
        Pattern {
            key: "unattached_disks",
            kind: ScanKind::Orphaned,
            resource_types: &["microsoft.compute/disks"],
            rules: vec![
                DetectionRule { property: "properties.managedBy", matcher: Matcher::IsNullOrEmpty },
                DetectionRule { property: "properties.diskState", matcher: Matcher::Exact(&["Unattached"]) },
            ],
            match_all: false,
            description: "Managed disks not attached to any VM",
            impact: "Medium - Ongoing storage costs without benefit",
            recommendation: "Evaluate if disk is still needed. Create snapshot before deletion if data recovery might be needed.",
            retirement_date: None,
            priority: Priority::Medium,
        },
        Pattern {
            key: "orphaned_snapshots",
            kind: ScanKind::Orphaned,
            resource_types: &["microsoft.compute/snapshots"],
            rules: vec![DetectionRule {
                property: "properties.creationData.sourceResourceId",
                matcher: Matcher::IsNullOrEmpty,
            }],
            match_all: false,
            description: "Snapshots whose source disks no longer exist",
            impact: "Low-Medium - Ongoing storage costs",
            recommendation: "Review snapshots and delete those no longer needed for backup or recovery",
            retirement_date: None,
            priority: Priority::Low,
        },
        Pattern {
            key: "unassociated_public_ips",
            kind: ScanKind::Orphaned,
            resource_types: &["microsoft.network/publicipaddresses"],
            rules: vec![DetectionRule {
                property: "properties.ipConfiguration",
                matcher: Matcher::IsNullOrEmpty,
            }],
            match_all: false,
            description: "Public IP addresses not associated with any resource",
            impact: "Low - Static IPs incur charges when unused",
            recommendation: "Delete unused public IPs or associate with resources that need them",
            retirement_date: None,
            priority: Priority::Low,
        },
        Pattern {
            key: "unused_network_interfaces",
            kind: ScanKind::Orphaned,
            resource_types: &["microsoft.network/networkinterfaces"],
            rules: vec![DetectionRule {
                property: "properties.virtualMachine",
                matcher: Matcher::IsNullOrEmpty,
            }],
            match_all: false,
            description: "Network interfaces not attached to any VM",
            impact: "Very Low - Minimal ongoing cost",
            recommendation: "Clean up unused network interfaces to reduce management overhead",
            retirement_date: None,
            priority: Priority::Low,
        },
        Pattern {
            key: "orphaned_network_security_groups",
            kind: ScanKind::Orphaned,
            resource_types: &["microsoft.network/networksecuritygroups"],
            rules: vec![
                DetectionRule { property: "properties.subnets", matcher: Matcher::IsEmptyArray },
                DetectionRule { property: "properties.networkInterfaces", matcher: Matcher::IsEmptyArray },
            ],
            // NSG 必須兩者皆空才算孤兒
            match_all: true,
            description: "Network Security Groups not associated with any subnet or network interface",
            impact: "None - But adds management complexity",
            recommendation: "Remove unused NSGs to simplify network security management",
            retirement_date: None,
            priority: Priority::Low,
        },
    ]
}

const DEPRECATED_QUERY: &str = r#"Resources
| where type in (
    "microsoft.network/publicipaddresses",
    "microsoft.network/loadbalancers",
    "microsoft.storage/storageaccounts",
    "microsoft.compute/virtualmachines",
    "microsoft.compute/disks"
)
| extend skuName = case(
    isnotnull(properties.sku.name), tostring(properties.sku.name),
    isnotnull(sku.name), tostring(sku.name),
    ""
)
| extend skuTier = case(
    isnotnull(properties.sku.tier), tostring(properties.sku.tier),
    isnotnull(sku.tier), tostring(sku.tier),
    ""
)
| extend vmSize = tostring(properties.hardwareProfile.vmSize)
| extend accessTier = tostring(properties.accessTier)
| extend diskType = tostring(properties.diskProperties.diskType)
| where (
    (type in ("microsoft.network/publicipaddresses", "microsoft.network/loadbalancers") and (skuName =~ "Basic" or skuTier =~ "Basic"))
    or (type == "microsoft.storage/storageaccounts" and skuName =~ "Standard_LRS")
    or (type == "microsoft.storage/storageaccounts" and accessTier =~ "Archive")
    or (type == "microsoft.compute/virtualmachines" and (vmSize contains "Standard_A" or vmSize contains "Basic_A"))
    or (type == "microsoft.compute/disks" and diskType =~ "Unmanaged")
)
| project id, name, resourceGroup, location, type, subscriptionId, sku, tags, properties"#;

const ORPHANED_QUERY: &str = r#"Resources
| where type in (
    "microsoft.compute/disks",
    "microsoft.compute/snapshots",
    "microsoft.network/publicipaddresses",
    "microsoft.network/networkinterfaces",
    "microsoft.network/networksecuritygroups"
)
| extend isOrphaned = case(
    type == "microsoft.compute/disks" and (isnull(properties.managedBy) or properties.managedBy == ""),
    true,
    type == "microsoft.network/publicipaddresses" and isnull(properties.ipConfiguration),
    true,
    type == "microsoft.network/networkinterfaces" and isnull(properties.virtualMachine),
    true,
    type == "microsoft.network/networksecuritygroups" and array_length(properties.subnets) == 0 and array_length(properties.networkInterfaces) == 0,
    true,
    type == "microsoft.compute/snapshots",
    true,
    false
)
| where isOrphaned == true
| project id, name, resourceGroup, location, type, subscriptionId, sku, tags, properties"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(managed_by: serde_json::Value) -> Resource {
        serde_json::from_value(serde_json::json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/d",
            "name": "d",
            "type": "microsoft.compute/disks",
            "properties": { "managedBy": managed_by, "diskSizeGB": 100 }
        }))
        .unwrap()
    }

    #[test]
    fn unattached_disk_matches_orphan_pattern() {
        let kb = KnowledgeBase::new();
        let pattern = kb
            .match_resource(ScanKind::Orphaned, &disk(serde_json::Value::String(String::new())))
            .unwrap();
        assert_eq!(pattern.key, "unattached_disks");
    }

    #[test]
    fn attached_disk_does_not_match() {
        let kb = KnowledgeBase::new();
        let attached = disk(serde_json::Value::String(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm".to_string(),
        ));
        assert!(kb.match_resource(ScanKind::Orphaned, &attached).is_none());
    }

    #[test]
    fn basic_sku_public_ip_is_deprecated() {
        let kb = KnowledgeBase::new();
        let pip: Resource = serde_json::from_value(serde_json::json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/ip",
            "type": "microsoft.network/publicipaddresses",
            "sku": { "name": "Basic" },
            "properties": {}
        }))
        .unwrap();

        let pattern = kb.match_resource(ScanKind::Deprecated, &pip).unwrap();
        assert_eq!(pattern.key, "public_ip_basic");
        assert_eq!(pattern.retirement_date, Some("2025-09-30"));
        assert_eq!(pattern.priority, Priority::High);
    }

    #[test]
    fn sku_match_is_case_insensitive() {
        let kb = KnowledgeBase::new();
        let pip: Resource = serde_json::from_value(serde_json::json!({
            "id": "/x",
            "type": "Microsoft.Network/publicIPAddresses",
            "properties": { "sku": { "name": "basic" } }
        }))
        .unwrap();
        assert!(kb.match_resource(ScanKind::Deprecated, &pip).is_some());
    }

    #[test]
    fn nsg_requires_both_associations_empty() {
        let kb = KnowledgeBase::new();
        let in_use: Resource = serde_json::from_value(serde_json::json!({
            "id": "/x",
            "type": "microsoft.network/networksecuritygroups",
            "properties": { "subnets": [], "networkInterfaces": [{ "id": "/nic" }] }
        }))
        .unwrap();
        assert!(kb.match_resource(ScanKind::Orphaned, &in_use).is_none());

        let orphaned: Resource = serde_json::from_value(serde_json::json!({
            "id": "/x",
            "type": "microsoft.network/networksecuritygroups",
            "properties": { "subnets": [], "networkInterfaces": [] }
        }))
        .unwrap();
        assert!(kb.match_resource(ScanKind::Orphaned, &orphaned).is_some());
    }

    #[test]
    fn a_series_vm_matches_prefix_rule() {
        let kb = KnowledgeBase::new();
        let vm: Resource = serde_json::from_value(serde_json::json!({
            "id": "/x",
            "type": "microsoft.compute/virtualmachines",
            "properties": { "hardwareProfile": { "vmSize": "Standard_A2" } }
        }))
        .unwrap();
        let pattern = kb.match_resource(ScanKind::Deprecated, &vm).unwrap();
        assert_eq!(pattern.key, "a_series_deprecated");
    }

    #[test]
    fn disk_cost_scales_with_size() {
        let kb = KnowledgeBase::new();
        let cost = kb
            .monthly_cost_estimate(&disk(serde_json::Value::String(String::new())))
            .unwrap();
        assert!((cost - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn static_public_ip_has_fixed_cost() {
        let kb = KnowledgeBase::new();
        let pip: Resource = serde_json::from_value(serde_json::json!({
            "id": "/x",
            "type": "microsoft.network/publicipaddresses",
            "properties": { "publicIPAllocationMethod": "Static" }
        }))
        .unwrap();
        assert_eq!(kb.monthly_cost_estimate(&pip), Some(3.65));
    }

    #[test]
    fn scan_query_appends_limit() {
        let kb = KnowledgeBase::new();
        let query = kb.scan_query(ScanKind::Orphaned, 50);
        assert!(query.contains("isOrphaned == true"));
        assert!(query.ends_with("| limit 50"));
    }

    #[test]
    fn guidance_falls_back_for_unknown_types() {
        let kb = KnowledgeBase::new();
        let guidance = kb.upgrade_guidance("Microsoft.Web/sites");
        assert_eq!(guidance.title, "Review Resource Configuration");
    }
}
