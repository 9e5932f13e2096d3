mod chain_id;
mod deployment;
mod gas;
mod tx;

pub use chain_id::*;
pub use deployment::*;
pub use gas::*;
pub use tx::*;
