use std::path::PathBuf;

use blockchat_ops_chain::LockFile;
use blockchat_ops_common::logger;
use blockchat_ops_config::default_lock_root;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
pub struct UnlockArgs {
    /// Task name, e.g. BlockChatUpgradeable2:update
    #[clap(long)]
    pub task: String,

    #[clap(long, help = "Lock directory (default: ~/.blockchat/locks)")]
    pub lock_dir: Option<PathBuf>,
}

/// Manual-intervention path for a lock left behind by an interrupted
/// run. Shows what the run got to before removing the lock, so the
/// operator can check the recorded transaction first.
pub async fn run(args: UnlockArgs) -> anyhow::Result<()> {
    let root = args.lock_dir.unwrap_or_else(default_lock_root);
    let lock_file = LockFile::new(root.join(format!("{}.lock", args.task)));

    match lock_file.load()? {
        None => {
            logger::info(format!(
                "no lock for `{}` at {}",
                args.task,
                lock_file.path().display()
            ));
        }
        Some(lock) => {
            logger::info(format!("lock: {}", lock_file.path().display()));
            logger::info(format!("created at: {} (unix ms)", lock.created_at_ms));
            match lock.submitted_tx {
                Some(tx) => logger::info(format!("submitted tx: {tx:#x}")),
                None => logger::info("no transaction was submitted"),
            }
            lock_file.remove()?;
            logger::outro(format!("lock for `{}` removed", args.task));
        }
    }
    Ok(())
}
