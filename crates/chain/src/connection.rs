//! `ethers`-backed implementation of the provider boundary.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use blockchat_ops_types::{DecodedEvent, TxOverrides, TxSummary};
use ethers::{
    abi::{Abi, RawLog, Token},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Filter, Log, TransactionReceipt,
        TransactionRequest, H256, U256,
    },
};

use crate::{
    error::RpcError,
    provider::{ContractConnection, PendingTx},
};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Connect a signing client; the wallet's chain id is read from the
/// node. Returns (client, chainId, operator address).
pub async fn connect_signer(
    rpc_url: &str,
    private_key: H256,
) -> anyhow::Result<(Arc<SignerClient>, u64, Address)> {
    let provider =
        Provider::<Http>::try_from(rpc_url).with_context(|| format!("invalid RPC URL {rpc_url}"))?;
    let chain_id = provider
        .get_chainid()
        .await
        .context("querying chain id")?
        .as_u64();
    let wallet = LocalWallet::from_bytes(private_key.as_bytes())
        .context("invalid private key")?
        .with_chain_id(chain_id);
    let operator = wallet.address();
    let client = Arc::new(SignerMiddleware::new(provider, wallet));
    Ok((client, chain_id, operator))
}

/// Map any provider-layer error onto the transient/fatal split. The
/// transport does not expose a structured classification, so network
/// and availability failures are recognized by message.
pub(crate) fn classify(err: impl std::fmt::Display) -> RpcError {
    const TRANSIENT_MARKERS: &[&str] = &[
        "timeout",
        "timed out",
        "connection",
        "connect",
        "reset by peer",
        "broken pipe",
        "temporarily unavailable",
        "429",
        "502",
        "503",
    ];
    let message = err.to_string();
    let lower = message.to_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        RpcError::transient(message)
    } else {
        RpcError::fatal(message)
    }
}

pub(crate) fn encode_call(
    abi: &Abi,
    method: &str,
    args: &[Token],
) -> Result<ethers::types::Bytes, RpcError> {
    let function = abi
        .function(method)
        .map_err(|err| RpcError::fatal(format!("no such method `{method}`: {err}")))?;
    let data = function
        .encode_input(args)
        .map_err(|err| RpcError::fatal(format!("encoding `{method}`: {err}")))?;
    Ok(data.into())
}

pub(crate) fn apply_overrides(
    mut tx: TransactionRequest,
    overrides: &TxOverrides,
) -> TransactionRequest {
    if let Some(value) = overrides.value {
        tx = tx.value(value);
    }
    if let Some(price) = overrides.gas_price {
        tx = tx.gas_price(price);
    }
    if let Some(limit) = overrides.gas_limit {
        tx = tx.gas(limit);
    }
    tx
}

fn decode_log(abi: &Abi, log: &Log) -> Option<DecodedEvent> {
    let topic0 = log.topics.first()?;
    for event in abi.events() {
        if event.signature() != *topic0 {
            continue;
        }
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        };
        if let Ok(parsed) = event.parse_log(raw) {
            return Some(DecodedEvent {
                name: event.name.clone(),
                params: parsed
                    .params
                    .into_iter()
                    .map(|p| (p.name, p.value))
                    .collect(),
            });
        }
    }
    None
}

/// Distill a receipt: status check, cost fields, and the logs emitted
/// by the contract of interest decoded against its ABI.
pub(crate) fn summarize_receipt(
    abi: &Abi,
    source: Option<Address>,
    receipt: &TransactionReceipt,
) -> Result<TxSummary, RpcError> {
    if receipt.status == Some(0.into()) {
        return Err(RpcError::fatal(format!(
            "transaction {:#x} reverted",
            receipt.transaction_hash
        )));
    }
    let source = source.or(receipt.contract_address);
    let events = receipt
        .logs
        .iter()
        .filter(|log| Some(log.address) == source)
        .filter_map(|log| decode_log(abi, log))
        .collect();
    Ok(TxSummary {
        tx_hash: receipt.transaction_hash,
        block_number: receipt
            .block_number
            .map(|n| n.as_u64())
            .ok_or_else(|| RpcError::fatal("receipt carries no block number"))?,
        gas_used: receipt.gas_used.unwrap_or_default(),
        effective_gas_price: receipt.effective_gas_price,
        contract_address: receipt.contract_address,
        events,
    })
}

/// A submitted transaction tracked by hash; the confirmation wait
/// re-attaches to the provider on demand.
pub(crate) struct EthersPending {
    pub client: Arc<SignerClient>,
    pub abi: Abi,
    /// Contract whose logs we decode; `None` for deploys, where the
    /// address comes from the receipt.
    pub address: Option<Address>,
    pub tx_hash: H256,
}

#[async_trait]
impl PendingTx for EthersPending {
    fn tx_hash(&self) -> H256 {
        self.tx_hash
    }

    async fn wait(&self, confirmations: usize) -> Result<TxSummary, RpcError> {
        let pending = PendingTransaction::new(self.tx_hash, self.client.provider())
            .confirmations(confirmations);
        let receipt = pending
            .await
            .map_err(classify)?
            .ok_or_else(|| RpcError::fatal(format!("transaction {:#x} was dropped", self.tx_hash)))?;
        summarize_receipt(&self.abi, self.address, &receipt)
    }
}

/// Read/write surface of one deployed contract over a signing client.
pub struct EthersConnection {
    client: Arc<SignerClient>,
    address: Address,
    abi: Abi,
}

impl EthersConnection {
    pub fn new(client: Arc<SignerClient>, address: Address, abi: Abi) -> Self {
        Self {
            client,
            address,
            abi,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn request(&self, method: &str, args: &[Token], overrides: &TxOverrides) -> Result<TypedTransaction, RpcError> {
        let data = encode_call(&self.abi, method, args)?;
        let tx = TransactionRequest::new().to(self.address).data(data);
        Ok(apply_overrides(tx, overrides).into())
    }
}

#[async_trait]
impl ContractConnection for EthersConnection {
    async fn call(&self, method: &str, args: Vec<Token>) -> Result<Vec<Token>, RpcError> {
        let tx = self.request(method, &args, &TxOverrides::default())?;
        let output = self.client.call(&tx, None).await.map_err(classify)?;
        let function = self
            .abi
            .function(method)
            .map_err(|err| RpcError::fatal(format!("no such method `{method}`: {err}")))?;
        function
            .decode_output(&output)
            .map_err(|err| RpcError::fatal(format!("decoding `{method}` output: {err}")))
    }

    async fn estimate_gas(
        &self,
        method: &str,
        args: Vec<Token>,
        overrides: &TxOverrides,
    ) -> Result<U256, RpcError> {
        let tx = self.request(method, &args, overrides)?;
        self.client.estimate_gas(&tx, None).await.map_err(classify)
    }

    async fn send(
        &self,
        method: &str,
        args: Vec<Token>,
        overrides: &TxOverrides,
    ) -> Result<Box<dyn PendingTx>, RpcError> {
        let tx = self.request(method, &args, overrides)?;
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

    async fn query_events(
        &self,
        event: &str,
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<Vec<DecodedEvent>, RpcError> {
        let event = self
            .abi
            .event(event)
            .map_err(|err| RpcError::fatal(format!("no such event: {err}")))?;
        let mut filter = Filter::new()
            .address(self.address)
            .topic0(event.signature())
            .from_block(from_block);
        if let Some(to) = to_block {
            filter = filter.to_block(to);
        }
        let logs = self.client.get_logs(&filter).await.map_err(classify)?;
        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            let raw = RawLog {
                topics: log.topics.clone(),
                data: log.data.to_vec(),
            };
            let parsed = event
                .parse_log(raw)
                .map_err(|err| RpcError::fatal(format!("decoding `{}` log: {err}", event.name)))?;
            events.push(DecodedEvent {
                name: event.name.clone(),
                params: parsed
                    .params
                    .into_iter()
                    .map(|p| (p.name, p.value))
                    .collect(),
            });
        }
        Ok(events)
    }
}
