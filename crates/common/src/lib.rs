pub mod config;
pub mod error;
pub mod files;
pub mod logger;

pub use config::{global_config, init_global_config, GlobalConfig};
pub use error::log_error;
