use std::{fmt, str::FromStr};

use ethers::types::U64;
use serde::{Deserialize, Serialize};

/// EVM chain id keying the deployment registry.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for ChainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // try to parse as decimal first, then as hex
        let number = match U64::from_dec_str(s) {
            Ok(u) => u,
            Err(_) => s
                .parse::<U64>()
                .map_err(|err| format!("Failed to parse chain id: {err}"))?,
        };
        Ok(Self(number.as_u64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex() {
        assert_eq!("1".parse::<ChainId>().unwrap(), ChainId::new(1));
        assert_eq!("0x89".parse::<ChainId>().unwrap(), ChainId::new(137));
        assert!("not-a-chain".parse::<ChainId>().is_err());
    }

    #[test]
    fn displays_as_decimal() {
        assert_eq!(ChainId::new(42161).to_string(), "42161");
    }
}
