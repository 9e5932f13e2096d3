use std::{io, path::PathBuf, time::Duration};

use ethers::types::H256;
use thiserror::Error;

/// Provider-boundary failure, classified for retry purposes. Only the
/// read path ever acts on the classification; write-path errors are
/// always fatal to the invocation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// Network/timeout class: safe to retry a read with the same args.
    Transient,
    /// Everything else: reverts, bad arguments, malformed responses.
    Fatal,
}

impl RpcError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: RpcErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: RpcErrorKind::Fatal,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == RpcErrorKind::Transient
    }
}

/// Errors surfaced by the executor, the transaction protocol and the
/// SDK client.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error(
        "unfinished run of task `{task}` detected (lock at {path}); \
         inspect it and re-run with --resume, or remove it with `unlock`",
        path = .lock_path.display()
    )]
    ResumeRequired {
        task: String,
        lock_path: PathBuf,
        created_at_ms: i64,
        submitted_tx: Option<H256>,
    },

    #[error("read call `{description}` failed")]
    Call {
        description: String,
        #[source]
        source: RpcError,
    },

    #[error("read call `{description}` still failing after {attempts} attempts")]
    RetriesExhausted {
        description: String,
        attempts: u32,
        #[source]
        source: RpcError,
    },

    #[error("failed to submit `{description}`")]
    Submission {
        description: String,
        #[source]
        source: RpcError,
    },

    #[error("`{description}` failed while waiting for confirmation")]
    Confirmation {
        description: String,
        #[source]
        source: RpcError,
    },

    #[error("`{description}` did not reach {confirmations} confirmation(s) within {timeout:?}")]
    ConfirmationTimeout {
        description: String,
        confirmations: usize,
        timeout: Duration,
    },

    #[error("transaction {tx_hash:#x} confirmed but emitted no `{event}` event")]
    MissingEvent { event: String, tx_hash: H256 },

    #[error("transaction {tx_hash:#x} emitted {count} `{event}` events, expected exactly one")]
    AmbiguousEvent {
        event: String,
        tx_hash: H256,
        count: usize,
    },

    #[error("`{event}` event is missing or has a mistyped `{param}` argument")]
    MalformedEvent {
        event: String,
        param: &'static str,
    },

    #[error("lock file {}", .path.display())]
    LockIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
