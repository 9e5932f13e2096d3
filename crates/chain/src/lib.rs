pub mod client;
pub mod hash;
pub mod protocol;

mod connection;
mod error;
mod executor;
mod lock;
mod ops;
mod provider;

pub use connection::{connect_signer, EthersConnection, SignerClient};
pub use error::{ChainError, RpcError, RpcErrorKind};
pub use executor::ExecutionManager;
pub use lock::{LockFile, TaskLock};
pub use ops::{DeployOperation, MethodOperation};
pub use provider::{ChainOperation, ContractConnection, PendingTx};
