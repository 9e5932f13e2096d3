use ethers::types::U256;

/// Safety margin applied to gas estimates: limit = estimate * 13 / 10.
/// Absorbs estimation drift between simulation and inclusion.
const GAS_MARGIN_NUM: u64 = 13;
const GAS_MARGIN_DEN: u64 = 10;

/// Gas limit for a state-changing call: `floor(estimate * 1.3)`.
pub fn gas_limit_with_margin(estimate: U256) -> U256 {
    estimate * GAS_MARGIN_NUM / GAS_MARGIN_DEN
}

/// Caller-supplied overrides for a state-changing call.
///
/// An explicit `gas_limit` skips estimation entirely; an explicit
/// `gas_price` pins the price but the limit is still computed from the
/// estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOverrides {
    pub gas_price: Option<U256>,
    pub gas_limit: Option<U256>,
    pub value: Option<U256>,
}

impl TxOverrides {
    pub fn with_gas_price(mut self, price: U256) -> Self {
        self.gas_price = Some(price);
        self
    }

    pub fn with_gas_limit(mut self, limit: U256) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    /// The limit to submit with: the override if present, otherwise the
    /// margined estimate.
    pub fn effective_gas_limit(&self, estimate: U256) -> U256 {
        self.gas_limit
            .unwrap_or_else(|| gas_limit_with_margin(estimate))
    }
}
