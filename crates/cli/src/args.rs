//! Flags shared by every transaction-submitting task.

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use blockchat_ops_chain::ExecutionManager;
use blockchat_ops_config::{default_lock_root, default_registry_root, DeploymentRegistry};
use blockchat_ops_types::TxOverrides;
use clap::Parser;
use ethers::{types::U256, utils::parse_units};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
pub struct TxArgs {
    #[clap(long, help = "RPC URL", default_value = "http://localhost:8545")]
    pub rpc_url: String,
    #[clap(long, visible_alias = "pk", help = "Operator private key")]
    pub private_key: ethers::types::H256,
    #[clap(long, help = "Confirmation depth to wait for", default_value_t = 1)]
    pub wait_num: usize,
    #[clap(long, help = "Gas price in gwei (default: node estimate)")]
    pub gas_price: Option<String>,
    #[clap(long, help = "Total attempts for read calls", default_value_t = 3)]
    pub retry_number: u32,
    #[clap(long, help = "Abort the confirmation wait after this many seconds")]
    pub confirmation_timeout: Option<u64>,
    #[clap(long, help = "Resume an unfinished prior run of the same task")]
    pub resume: bool,
    #[clap(long, help = "Lock directory (default: ~/.blockchat/locks)")]
    pub lock_dir: Option<PathBuf>,
    #[clap(long, help = "Registry directory (default: ~/.blockchat/deployments)")]
    pub registry_dir: Option<PathBuf>,
}

impl TxArgs {
    pub fn execution_manager(&self, task: &str) -> ExecutionManager {
        let lock_root = self.lock_dir.clone().unwrap_or_else(default_lock_root);
        let mut manager =
            ExecutionManager::new(task, lock_root, self.retry_number, self.wait_num)
                .with_resume(self.resume);
        if let Some(seconds) = self.confirmation_timeout {
            manager = manager.with_confirmation_deadline(Duration::from_secs(seconds));
        }
        manager
    }

    pub fn overrides(&self) -> anyhow::Result<TxOverrides> {
        let mut overrides = TxOverrides::default();
        if let Some(gwei) = &self.gas_price {
            let price: U256 = parse_units(gwei, "gwei")
                .with_context(|| format!("invalid gas price {gwei}"))?
                .into();
            overrides = overrides.with_gas_price(price);
        }
        Ok(overrides)
    }

    pub fn registry(&self) -> DeploymentRegistry {
        let root = self
            .registry_dir
            .clone()
            .unwrap_or_else(default_registry_root);
        DeploymentRegistry::new(root)
    }
}
