use blockchat_ops_common::{
    config::{init_global_config, GlobalConfig},
    error::log_error,
    logger,
};
use clap::{Parser, Subcommand};
use xshell::Shell;

use crate::commands::{
    deploy::DeployArgs, status::StatusArgs, unlock::UnlockArgs, upgrade::UpgradeArgs,
};

mod args;
mod commands;
mod utils;

#[derive(Parser, Debug)]
#[command(name = "blockchat-ops", about)]
struct BlockchatOps {
    #[command(subcommand)]
    command: BlockchatOpsSubcommands,
    #[clap(flatten)]
    global: BlockchatOpsGlobalArgs,
}

#[derive(Subcommand, Debug)]
pub enum BlockchatOpsSubcommands {
    /// Deploy the implementation behind a fresh ERC1967 proxy
    Deploy(DeployArgs),
    /// Upgrade an existing proxy to a new implementation
    Upgrade(UpgradeArgs),
    /// Print the deployment registry for a chain
    Status(StatusArgs),
    /// Inspect and remove a stale task lock
    Unlock(UnlockArgs),
}

#[derive(Parser, Debug)]
#[clap(next_help_heading = "Global options")]
struct BlockchatOpsGlobalArgs {
    /// Verbose mode
    #[clap(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    human_panic::setup_panic!();
    let cli_args = BlockchatOps::parse();
    match run_subcommand(cli_args).await {
        Ok(_) => {}
        Err(error) => {
            log_error(error);
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn run_subcommand(cli_args: BlockchatOps) -> anyhow::Result<()> {
    logger::new_empty_line();
    logger::intro("blockchat-ops");

    init_global_config(GlobalConfig {
        verbose: cli_args.global.verbose,
    });
    let shell = Shell::new()?;

    match cli_args.command {
        BlockchatOpsSubcommands::Deploy(args) => commands::deploy::run(args, &shell).await?,
        BlockchatOpsSubcommands::Upgrade(args) => commands::upgrade::run(args, &shell).await?,
        BlockchatOpsSubcommands::Status(args) => commands::status::run(args).await?,
        BlockchatOpsSubcommands::Unlock(args) => commands::unlock::run(args).await?,
    }
    Ok(())
}
