use crate::utils::error::{OptimizerError, Result};
use std::fmt;

/// Typed view of a full ARM resource id:
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider_namespace: String,
    pub resource_type: String,
    pub name: String,
    /// Trailing segments of a child resource id
    /// (`ipConfigurations/ipconfig1` …), kept so `Display` reproduces the
    /// exact id ARM expects.
    pub child_path: Vec<String>,
}

impl ResourceId {
    pub fn parse(id: &str) -> Result<Self> {
        let parts: Vec<&str> = id.trim_matches('/').split('/').collect();

        if parts.len() < 8
            || !parts[0].eq_ignore_ascii_case("subscriptions")
            || !parts[2].eq_ignore_ascii_case("resourceGroups")
            || !parts[4].eq_ignore_ascii_case("providers")
        {
            return Err(OptimizerError::InvalidResourceId { id: id.to_string() });
        }

        Ok(Self {
            subscription_id: parts[1].to_string(),
            resource_group: parts[3].to_string(),
            provider_namespace: parts[5].to_string(),
            resource_type: parts[6].to_string(),
            name: parts[7].to_string(),
            child_path: parts[8..].iter().map(|s| s.to_string()).collect(),
        })
    }

    /// `Microsoft.Network/publicIPAddresses` style qualified type.
    pub fn qualified_type(&self) -> String {
        format!("{}/{}", self.provider_namespace, self.resource_type)
    }

    /// Id of the resource group collection this resource lives in, used for
    /// listing sibling resources of another type.
    pub fn sibling_collection(&self, provider_namespace: &str, resource_type: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
            self.subscription_id, self.resource_group, provider_namespace, resource_type
        )
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id,
            self.resource_group,
            self.provider_namespace,
            self.resource_type,
            self.name
        )?;
        for segment in &self.child_path {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIP_ID: &str =
        "/subscriptions/sub-1/resourceGroups/rg-prod/providers/Microsoft.Network/publicIPAddresses/ip-web";

    #[test]
    fn parses_full_resource_id() {
        let parsed = ResourceId::parse(PIP_ID).unwrap();
        assert_eq!(parsed.subscription_id, "sub-1");
        assert_eq!(parsed.resource_group, "rg-prod");
        assert_eq!(parsed.provider_namespace, "Microsoft.Network");
        assert_eq!(parsed.resource_type, "publicIPAddresses");
        assert_eq!(parsed.name, "ip-web");
        assert!(parsed.child_path.is_empty());
        assert_eq!(parsed.qualified_type(), "Microsoft.Network/publicIPAddresses");
    }

    #[test]
    fn round_trips_to_canonical_string() {
        let parsed = ResourceId::parse(PIP_ID).unwrap();
        assert_eq!(parsed.to_string(), PIP_ID);
    }

    #[test]
    fn child_resource_id_round_trips() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic1/ipConfigurations/ipconfig1";
        let parsed = ResourceId::parse(id).unwrap();
        assert_eq!(parsed.resource_type, "networkInterfaces");
        // 名稱屬於父資源,子路徑另外保留
        assert_eq!(parsed.name, "nic1");
        assert_eq!(parsed.child_path, vec!["ipConfigurations", "ipconfig1"]);
        assert_eq!(parsed.to_string(), id);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(ResourceId::parse("").is_err());
        assert!(ResourceId::parse("/subscriptions/s/wrong/rg").is_err());
        assert!(ResourceId::parse("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network").is_err());
    }

    #[test]
    fn sibling_collection_targets_same_resource_group() {
        let parsed = ResourceId::parse(PIP_ID).unwrap();
        assert_eq!(
            parsed.sibling_collection("Microsoft.Network", "loadBalancers"),
            "/subscriptions/sub-1/resourceGroups/rg-prod/providers/Microsoft.Network/loadBalancers"
        );
    }
}
