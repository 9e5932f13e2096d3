use std::collections::BTreeMap;

use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Durable record of one deployed upgradeable contract on one chain.
///
/// Serialized camelCase to stay compatible with the registry files the
/// original tooling wrote. Exactly one live record exists per
/// (chain id, contract name) pair; an update replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Stable address clients call; logic behind it can be upgraded.
    pub proxy_address: Address,
    /// Address of the current logic contract behind the proxy.
    pub impl_address: Address,
    /// Semantic version read back from the deployed implementation.
    pub version: String,
    /// Contract name this record belongs to.
    pub contract: String,
    /// Account that executed the deploy/upgrade.
    pub operator: Address,
    /// Block number at which this record became valid. Used as the scan
    /// lower bound for event queries by clients.
    pub from_block: u64,
}

/// All records for one chain, keyed by contract name.
pub type Deployments = BTreeMap<String, DeploymentRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let record = DeploymentRecord {
            proxy_address: Address::repeat_byte(0x11),
            impl_address: Address::repeat_byte(0x22),
            version: "2.0.0".to_string(),
            contract: "BlockChatUpgradeable2".to_string(),
            operator: Address::repeat_byte(0x33),
            from_block: 1234,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("proxyAddress").is_some());
        assert!(json.get("implAddress").is_some());
        assert_eq!(json["fromBlock"], 1234);

        let back: DeploymentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
