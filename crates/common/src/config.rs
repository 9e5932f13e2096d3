use std::sync::OnceLock;

/// Process-wide CLI configuration, set once at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalConfig {
    pub verbose: bool,
}

static GLOBAL_CONFIG: OnceLock<GlobalConfig> = OnceLock::new();

pub fn init_global_config(config: GlobalConfig) {
    let _ = GLOBAL_CONFIG.set(config);
}

pub fn global_config() -> GlobalConfig {
    GLOBAL_CONFIG.get().copied().unwrap_or_default()
}
