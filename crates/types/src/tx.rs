use std::collections::BTreeMap;

use ethers::{
    abi::Token,
    types::{Address, H256, U256},
};
use serde_json::Value;

/// A contract event decoded from a confirmed transaction's logs.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    pub params: Vec<(String, Token)>,
}

impl DecodedEvent {
    pub fn param(&self, name: &str) -> Option<&Token> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }
}

/// Receipt distilled to provider-independent fields. The raw receipt is
/// never handed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct TxSummary {
    pub tx_hash: H256,
    pub block_number: u64,
    pub gas_used: U256,
    pub effective_gas_price: Option<U256>,
    /// Set for contract-creation transactions.
    pub contract_address: Option<Address>,
    pub events: Vec<DecodedEvent>,
}

/// Progress of one state-changing operation: at most two emissions,
/// always in this order.
#[derive(Debug, Clone)]
pub enum TxProgress {
    Submitted(H256),
    Confirmed(TxSummary),
}

/// Result fields extracted from a confirmed transaction by name.
/// Requested fields that the receipt does not carry are omitted.
#[derive(Debug, Clone, Default)]
pub struct TxResult {
    fields: BTreeMap<String, Value>,
}

impl TxResult {
    pub fn from_summary(summary: &TxSummary, fields: &[&str]) -> Self {
        let mut out = BTreeMap::new();
        for &field in fields {
            let value = match field {
                "blockNumber" => Some(Value::from(summary.block_number)),
                "transactionHash" => Some(Value::from(format!("{:#x}", summary.tx_hash))),
                "gasUsed" => Some(Value::from(summary.gas_used.to_string())),
                "effectiveGasPrice" => summary
                    .effective_gas_price
                    .map(|price| Value::from(price.to_string())),
                "contractAddress" => summary
                    .contract_address
                    .map(|addr| Value::from(format!("{addr:#x}"))),
                _ => None,
            };
            if let Some(value) = value {
                out.insert(field.to_string(), value);
            }
        }
        Self { fields: out }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn block_number(&self) -> Option<u64> {
        self.fields.get("blockNumber").and_then(Value::as_u64)
    }

    pub fn contract_address(&self) -> Option<Address> {
        self.fields
            .get("contractAddress")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> TxSummary {
        TxSummary {
            tx_hash: H256::repeat_byte(0xab),
            block_number: 777,
            gas_used: U256::from(21_000u64),
            effective_gas_price: None,
            contract_address: Some(Address::repeat_byte(0x44)),
            events: vec![],
        }
    }

    #[test]
    fn extracts_only_requested_fields() {
        let result = TxResult::from_summary(&summary(), &["blockNumber", "contractAddress"]);
        assert_eq!(result.block_number(), Some(777));
        assert_eq!(result.contract_address(), Some(Address::repeat_byte(0x44)));
        assert!(result.get("gasUsed").is_none());
    }

    #[test]
    fn absent_fields_are_omitted() {
        // effectiveGasPrice is None in the summary, so the field is dropped
        let result = TxResult::from_summary(&summary(), &["effectiveGasPrice", "unknownField"]);
        assert!(result.get("effectiveGasPrice").is_none());
        assert!(result.get("unknownField").is_none());
    }

    #[test]
    fn event_param_lookup_by_name() {
        let event = DecodedEvent {
            name: "MessageCreated".to_string(),
            params: vec![
                ("messageId".to_string(), Token::Uint(U256::from(5u64))),
                ("sender".to_string(), Token::Address(Address::zero())),
            ],
        };
        assert_eq!(
            event.param("messageId"),
            Some(&Token::Uint(U256::from(5u64)))
        );
        assert!(event.param("missing").is_none());
    }
}
