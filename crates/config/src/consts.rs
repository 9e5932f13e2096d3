use std::path::PathBuf;

pub const REGISTRY_ROOT_ENV: &str = "BLOCKCHAT_REGISTRY_ROOT";
pub const LOCK_ROOT_ENV: &str = "BLOCKCHAT_LOCK_ROOT";

/// Default registry root: ~/.blockchat/deployments
pub fn default_registry_root() -> PathBuf {
    root_from(REGISTRY_ROOT_ENV, "deployments")
}

/// Default lock root: ~/.blockchat/locks
pub fn default_lock_root() -> PathBuf {
    root_from(LOCK_ROOT_ENV, "locks")
}

fn root_from(env: &str, leaf: &str) -> PathBuf {
    if let Ok(path) = std::env::var(env) {
        PathBuf::from(path)
    } else {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".blockchat").join(leaf)
    }
}
