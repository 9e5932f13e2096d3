//! Compiled-contract artifact as emitted by the build tools.

use std::str::FromStr;

use anyhow::Context;
use ethers::{abi::Abi, types::Bytes};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub abi: Abi,
    bytecode: BytecodeField,
}

/// hardhat stores creation bytecode as a hex string, forge nests it
/// under `object`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Plain(String),
    Object { object: String },
}

impl Artifact {
    pub fn bytecode(&self) -> anyhow::Result<Bytes> {
        let hex = match &self.bytecode {
            BytecodeField::Plain(hex) => hex,
            BytecodeField::Object { object } => object,
        };
        Bytes::from_str(hex).context("artifact bytecode is not valid hex")
    }
}
