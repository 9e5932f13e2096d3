use std::path::PathBuf;

use anyhow::Context;
use blockchat_ops_chain::{
    client::MessageClient, connect_signer, DeployOperation, EthersConnection,
};
use blockchat_ops_common::logger;
use blockchat_ops_config::traits::ReadConfig;
use blockchat_ops_types::{ChainId, DeploymentRecord};
use clap::Parser;
use ethers::abi::Token;
use serde::{Deserialize, Serialize};
use xshell::Shell;

use crate::{args::TxArgs, utils::artifact::Artifact};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
pub struct DeployArgs {
    /// Contract name, used as the registry key and task name
    #[clap(long, default_value = "BlockChatUpgradeable2")]
    pub contract: String,

    /// Implementation artifact (hardhat or forge JSON)
    #[clap(long)]
    pub artifact: PathBuf,

    /// ERC1967 proxy artifact
    #[clap(long)]
    pub proxy_artifact: PathBuf,

    #[clap(flatten)]
    #[serde(flatten)]
    pub tx: TxArgs,
}

pub async fn run(args: DeployArgs, shell: &Shell) -> anyhow::Result<()> {
    let implementation = Artifact::read(shell, &args.artifact)?;
    let proxy = Artifact::read(shell, &args.proxy_artifact)?;

    let (client, chain_id, operator) =
        connect_signer(&args.tx.rpc_url, args.tx.private_key).await?;
    let chain = ChainId::new(chain_id);
    logger::info(format!("chain {chain}, operator {operator:#x}"));

    let task = format!("{}:deploy", args.contract);
    let mut manager = args.tx.execution_manager(&task);
    manager.load()?;
    let overrides = args.tx.overrides()?;

    let deploy_impl = DeployOperation::new(
        client.clone(),
        implementation.abi.clone(),
        implementation.bytecode()?,
        vec![],
    );
    let deployed = manager
        .transaction(
            &deploy_impl,
            &["contractAddress", "blockNumber"],
            "deploy implementation",
            &overrides,
        )
        .await?;
    let impl_address = deployed
        .contract_address()
        .context("implementation receipt carries no contract address")?;

    // ERC1967Proxy(implementation, initializer calldata)
    let init_calldata = match implementation.abi.function("initialize") {
        Ok(function) => function.encode_input(&[]).context("encoding initialize()")?,
        Err(_) => vec![],
    };
    let deploy_proxy = DeployOperation::new(
        client.clone(),
        proxy.abi.clone(),
        proxy.bytecode()?,
        vec![Token::Address(impl_address), Token::Bytes(init_calldata)],
    );
    let proxied = manager
        .transaction(
            &deploy_proxy,
            &["contractAddress", "blockNumber"],
            "deploy proxy",
            &overrides,
        )
        .await?;
    let proxy_address = proxied
        .contract_address()
        .context("proxy receipt carries no contract address")?;
    let from_block = proxied
        .block_number()
        .context("proxy receipt carries no block number")?;

    let connection = EthersConnection::new(client, proxy_address, implementation.abi.clone());
    let sdk = MessageClient::new(connection, args.tx.wait_num);
    let version = manager
        .call("implementationVersion", || sdk.implementation_version())
        .await?;

    let registry = args.tx.registry();
    let mut deployments = registry.get_or_default(chain)?;
    deployments.insert(
        args.contract.clone(),
        DeploymentRecord {
            proxy_address,
            impl_address,
            version: version.clone(),
            contract: args.contract.clone(),
            operator,
            from_block,
        },
    );
    registry.set(chain, &deployments)?;
    logger::info(format!(
        "registry updated: {}",
        registry.path_for(chain).display()
    ));

    manager.print_gas();
    manager.delete_lock()?;
    logger::outro(format!(
        "{} {} deployed at {:#x} (impl {:#x})",
        args.contract, version, proxy_address, impl_address
    ));
    Ok(())
}
