use std::path::PathBuf;

use anyhow::Context;
use blockchat_ops_chain::{
    client::MessageClient, connect_signer, DeployOperation, EthersConnection, MethodOperation,
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
pub struct UpgradeArgs {
    /// Contract name, used as the registry key and task name
    #[clap(long, default_value = "BlockChatUpgradeable2")]
    pub contract: String,

    /// New implementation artifact (hardhat or forge JSON)
    #[clap(long)]
    pub artifact: PathBuf,

    #[clap(flatten)]
    #[serde(flatten)]
    pub tx: TxArgs,
}

pub async fn run(args: UpgradeArgs, shell: &Shell) -> anyhow::Result<()> {
    let implementation = Artifact::read(shell, &args.artifact)?;

    let (client, chain_id, operator) =
        connect_signer(&args.tx.rpc_url, args.tx.private_key).await?;
    let chain = ChainId::new(chain_id);

    let registry = args.tx.registry();
    let mut deployments = registry.get(chain)?;
    let record = deployments
        .get(&args.contract)
        .with_context(|| format!("{} is not deployed on chain {chain}", args.contract))?
        .clone();
    logger::info(format!(
        "upgrading {} at {:#x} (currently {} / {:#x})",
        args.contract, record.proxy_address, record.version, record.impl_address
    ));

    let task = format!("{}:update", args.contract);
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

    let upgrade = MethodOperation::new(
        client.clone(),
        implementation.abi.clone(),
        record.proxy_address,
        "upgradeTo",
        vec![Token::Address(impl_address)],
    );
    let upgraded = manager
        .transaction(
            &upgrade,
            &["blockNumber", "transactionHash"],
            "upgrade proxy",
            &overrides,
        )
        .await?;
    let from_block = upgraded
        .block_number()
        .context("upgrade receipt carries no block number")?;

    let connection =
        EthersConnection::new(client, record.proxy_address, implementation.abi.clone());
    let sdk = MessageClient::new(connection, args.tx.wait_num);
    let version = manager
        .call("implementationVersion", || sdk.implementation_version())
        .await?;

    deployments.insert(
        args.contract.clone(),
        DeploymentRecord {
            proxy_address: record.proxy_address,
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
        "{} upgraded to {} (impl {:#x})",
        args.contract, version, impl_address
    ));
    Ok(())
}
