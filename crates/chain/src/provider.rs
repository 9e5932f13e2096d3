//! The capability set the executor and SDK consume from a node/signer.
//! No specific network transport is assumed; tests substitute mocks.

use async_trait::async_trait;
use blockchat_ops_types::{DecodedEvent, TxOverrides, TxSummary};
use ethers::{
    abi::Token,
    types::{H256, U256},
};

use crate::error::RpcError;

/// A submitted, not yet confirmed transaction.
#[async_trait]
pub trait PendingTx: Send + Sync {
    fn tx_hash(&self) -> H256;

    /// Block until `confirmations` blocks are mined on top of the
    /// transaction's block, then distill the receipt.
    async fn wait(&self, confirmations: usize) -> Result<TxSummary, RpcError>;
}

/// One state-changing operation, bound to its arguments. Deploys and
/// method calls both take this shape so the executor can drive either.
#[async_trait]
pub trait ChainOperation: Send + Sync {
    async fn estimate_gas(&self, overrides: &TxOverrides) -> Result<U256, RpcError>;

    async fn submit(&self, overrides: &TxOverrides) -> Result<Box<dyn PendingTx>, RpcError>;
}

/// Read/write surface of one deployed contract.
#[async_trait]
pub trait ContractConnection: Send + Sync {
    /// Read-only call; returns the decoded output tokens.
    async fn call(&self, method: &str, args: Vec<Token>) -> Result<Vec<Token>, RpcError>;

    async fn estimate_gas(
        &self,
        method: &str,
        args: Vec<Token>,
        overrides: &TxOverrides,
    ) -> Result<U256, RpcError>;

    async fn send(
        &self,
        method: &str,
        args: Vec<Token>,
        overrides: &TxOverrides,
    ) -> Result<Box<dyn PendingTx>, RpcError>;

    /// Decoded logs of `event` emitted by this contract in the given
    /// block range (`to_block` defaults to latest).
    async fn query_events(
        &self,
        event: &str,
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<Vec<DecodedEvent>, RpcError>;
}
