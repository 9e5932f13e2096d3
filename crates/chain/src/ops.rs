//! Concrete `ChainOperation`s the administrative tasks drive through
//! the execution manager: contract creation and bound method calls.

use std::sync::Arc;

use async_trait::async_trait;
use blockchat_ops_types::TxOverrides;
use ethers::{
    abi::{Abi, Token},
    providers::Middleware,
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, U256},
};

use crate::{
    connection::{apply_overrides, classify, encode_call, EthersPending, SignerClient},
    error::RpcError,
    provider::{ChainOperation, PendingTx},
};

/// Deploys a contract: creation bytecode plus optional constructor
/// arguments.
pub struct DeployOperation {
    client: Arc<SignerClient>,
    abi: Abi,
    bytecode: Bytes,
    args: Vec<Token>,
}

impl DeployOperation {
    pub fn new(client: Arc<SignerClient>, abi: Abi, bytecode: Bytes, args: Vec<Token>) -> Self {
        Self {
            client,
            abi,
            bytecode,
            args,
        }
    }

    fn creation_tx(&self, overrides: &TxOverrides) -> Result<TypedTransaction, RpcError> {
        let data: Vec<u8> = match self.abi.constructor() {
            Some(ctor) => ctor
                .encode_input(self.bytecode.to_vec(), &self.args)
                .map_err(|err| RpcError::fatal(format!("encoding constructor: {err}")))?,
            None if self.args.is_empty() => self.bytecode.to_vec(),
            None => {
                return Err(RpcError::fatal(
                    "constructor arguments provided but the ABI has no constructor",
                ))
            }
        };
        let tx = TransactionRequest::new().data(data);
        Ok(apply_overrides(tx, overrides).into())
    }
}

#[async_trait]
impl ChainOperation for DeployOperation {
    async fn estimate_gas(&self, overrides: &TxOverrides) -> Result<U256, RpcError> {
        let tx = self.creation_tx(overrides)?;
        self.client.estimate_gas(&tx, None).await.map_err(classify)
    }

    async fn submit(&self, overrides: &TxOverrides) -> Result<Box<dyn PendingTx>, RpcError> {
        let tx = self.creation_tx(overrides)?;
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(classify)?;
        let tx_hash = *pending;
        Ok(Box::new(EthersPending {
            client: self.client.clone(),
            abi: self.abi.clone(),
            // the deployed address is only known from the receipt
            address: None,
            tx_hash,
        }))
    }
}

/// A state-changing method call bound to an existing contract.
pub struct MethodOperation {
    client: Arc<SignerClient>,
    abi: Abi,
    address: Address,
    method: String,
    args: Vec<Token>,
}

impl MethodOperation {
    pub fn new(
        client: Arc<SignerClient>,
        abi: Abi,
        address: Address,
        method: impl Into<String>,
        args: Vec<Token>,
    ) -> Self {
        Self {
            client,
            abi,
            address,
            method: method.into(),
            args,
        }
    }

    fn call_tx(&self, overrides: &TxOverrides) -> Result<TypedTransaction, RpcError> {
        let data = encode_call(&self.abi, &self.method, &self.args)?;
        let tx = TransactionRequest::new().to(self.address).data(data);
        Ok(apply_overrides(tx, overrides).into())
    }
}

#[async_trait]
impl ChainOperation for MethodOperation {
    async fn estimate_gas(&self, overrides: &TxOverrides) -> Result<U256, RpcError> {
        let tx = self.call_tx(overrides)?;
        self.client.estimate_gas(&tx, None).await.map_err(classify)
    }

    async fn submit(&self, overrides: &TxOverrides) -> Result<Box<dyn PendingTx>, RpcError> {
        let tx = self.call_tx(overrides)?;
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(classify)?;
        let tx_hash = *pending;
        Ok(Box::new(EthersPending {
            client: self.client.clone(),
            abi: self.abi.clone(),
            address: Some(self.address),
            tx_hash,
        }))
    }
}
