use std::path::PathBuf;

use blockchat_ops_common::logger;
use blockchat_ops_config::{default_registry_root, DeploymentRegistry};
use blockchat_ops_types::ChainId;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
pub struct StatusArgs {
    /// Chain id (decimal or 0x-hex)
    #[clap(long)]
    pub chain_id: ChainId,

    #[clap(long, help = "Registry directory (default: ~/.blockchat/deployments)")]
    pub registry_dir: Option<PathBuf>,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let root = args.registry_dir.unwrap_or_else(default_registry_root);
    let registry = DeploymentRegistry::new(root);
    let deployments = registry.get(args.chain_id)?;
    logger::info(format!(
        "registry {}",
        registry.path_for(args.chain_id).display()
    ));
    println!("{}", serde_json::to_string_pretty(&deployments)?);
    Ok(())
}
