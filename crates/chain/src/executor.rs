use std::{future::Future, path::Path, time::Duration};

use blockchat_ops_common::logger;
use blockchat_ops_types::{TxOverrides, TxResult};
use ethers::types::{H256, U256};

use crate::{
    error::{ChainError, RpcError},
    lock::{LockFile, TaskLock},
    provider::ChainOperation,
};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Drives exactly one privileged on-chain operation to completion, with
/// resumability across process restarts and per-invocation cost
/// accounting.
///
/// Protocol: `load()` acquires the task lock before anything is
/// submitted; `delete_lock()` releases it only after the caller has
/// persisted the outcome. A lock left behind by a crashed run is
/// surfaced on the next `load()` instead of being silently retried.
pub struct ExecutionManager {
    task: String,
    lock: LockFile,
    retry_budget: u32,
    retry_delay: Duration,
    confirmations: usize,
    confirmation_deadline: Option<Duration>,
    allow_resume: bool,
    resume_tx: Option<H256>,
    gas_used_total: U256,
    fee_total: U256,
}

impl ExecutionManager {
    pub fn new(
        task: impl Into<String>,
        lock_root: impl AsRef<Path>,
        retry_budget: u32,
        confirmations: usize,
    ) -> Self {
        let task = task.into();
        let lock = LockFile::new(lock_root.as_ref().join(format!("{task}.lock")));
        Self {
            task,
            lock,
            retry_budget: retry_budget.max(1),
            retry_delay: DEFAULT_RETRY_DELAY,
            confirmations,
            confirmation_deadline: None,
            allow_resume: false,
            resume_tx: None,
            gas_used_total: U256::zero(),
            fee_total: U256::zero(),
        }
    }

    /// Opt into resuming an unfinished prior run instead of failing.
    pub fn with_resume(mut self, allow: bool) -> Self {
        self.allow_resume = allow;
        self
    }

    /// Bound the confirmation wait so a stalled chain cannot block the
    /// task forever.
    pub fn with_confirmation_deadline(mut self, deadline: Duration) -> Self {
        self.confirmation_deadline = Some(deadline);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// The transaction hash recorded by an interrupted run, available
    /// after a `load()` that resumed.
    pub fn resume_tx(&self) -> Option<H256> {
        self.resume_tx
    }

    /// Acquire the task lock. A pre-existing lock is evidence of an
    /// unfinished prior run and fails with `ResumeRequired` unless
    /// resume was explicitly opted into.
    pub fn load(&mut self) -> Result<(), ChainError> {
        match self.lock.load()? {
            None => {
                self.lock.create(&TaskLock::new(&self.task))?;
                logger::debug(format!(
                    "lock created at {}",
                    self.lock.path().display()
                ));
                Ok(())
            }
            Some(existing) => {
                if !self.allow_resume {
                    return Err(ChainError::ResumeRequired {
                        task: self.task.clone(),
                        lock_path: self.lock.path().to_path_buf(),
                        created_at_ms: existing.created_at_ms,
                        submitted_tx: existing.submitted_tx,
                    });
                }
                self.resume_tx = existing.submitted_tx;
                logger::warn(format!(
                    "resuming unfinished run of `{}` (lock created at {})",
                    self.task, existing.created_at_ms
                ));
                Ok(())
            }
        }
    }

    /// Invoke a read-only provider call, retrying transient failures up
    /// to the retry budget (total attempts) with the same arguments.
    /// The final underlying error is surfaced verbatim as the source
    /// when the budget is exhausted.
    pub async fn call<T, F, Fut>(&self, description: &str, mut op: F) -> Result<T, ChainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        logger::debug(format!("call: {description}"));
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.retry_budget => {
                    logger::warn(format!(
                        "{description}: transient failure (attempt {attempt}/{}): {err}",
                        self.retry_budget
                    ));
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(err) if err.is_transient() => {
                    return Err(ChainError::RetriesExhausted {
                        description: description.to_string(),
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    return Err(ChainError::Call {
                        description: description.to_string(),
                        source: err,
                    });
                }
            }
        }
    }

    /// Submit one state-changing operation and wait for confirmation.
    ///
    /// Never retried: blind resubmission of a state change risks double
    /// execution. On any failure the lock stays in place so the next
    /// invocation sees the unfinished run.
    pub async fn transaction(
        &mut self,
        op: &dyn ChainOperation,
        result_fields: &[&str],
        description: &str,
        overrides: &TxOverrides,
    ) -> Result<TxResult, ChainError> {
        let mut effective = overrides.clone();
        if effective.gas_limit.is_none() {
            let estimate = op.estimate_gas(overrides).await.map_err(|source| {
                ChainError::Submission {
                    description: description.to_string(),
                    source,
                }
            })?;
            let limit = effective.effective_gas_limit(estimate);
            effective.gas_limit = Some(limit);
            logger::debug(format!(
                "{description}: estimated {estimate} gas, limit {limit}"
            ));
        }

        logger::step(format!("{description}: submitting..."));
        let pending = op
            .submit(&effective)
            .await
            .map_err(|source| ChainError::Submission {
                description: description.to_string(),
                source,
            })?;
        let tx_hash = pending.tx_hash();
        self.lock.record_submission(&self.task, tx_hash)?;
        logger::info(format!("{description}: submitted {tx_hash:#x}"));

        let wait = pending.wait(self.confirmations);
        let summary = match self.confirmation_deadline {
            Some(deadline) => tokio::time::timeout(deadline, wait)
                .await
                .map_err(|_| ChainError::ConfirmationTimeout {
                    description: description.to_string(),
                    confirmations: self.confirmations,
                    timeout: deadline,
                })?,
            None => wait.await,
        }
        .map_err(|source| ChainError::Confirmation {
            description: description.to_string(),
            source,
        })?;

        self.gas_used_total += summary.gas_used;
        if let Some(price) = summary.effective_gas_price {
            self.fee_total += summary.gas_used * price;
        }
        logger::info(format!(
            "{description}: confirmed in block {} ({} gas)",
            summary.block_number, summary.gas_used
        ));

        Ok(TxResult::from_summary(&summary, result_fields))
    }

    /// Report the gas accumulated by every `transaction` call in this
    /// manager's lifetime.
    pub fn print_gas(&self) {
        logger::info(format!("total gas used: {}", self.gas_used_total));
        if !self.fee_total.is_zero() {
            logger::info(format!("total fee paid: {} wei", self.fee_total));
        }
    }

    /// Release the task lock. Must be the last call of a successful
    /// task, after the registry write: lock absent means the last known
    /// operation completed and was persisted.
    pub fn delete_lock(&self) -> Result<(), ChainError> {
        self.lock.remove()
    }
}
