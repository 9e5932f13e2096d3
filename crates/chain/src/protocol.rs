//! The four-phase protocol every state-changing SDK method follows:
//! estimate, submit, confirm, extract. One implementation instead of a
//! copy per contract method.

use blockchat_ops_types::{DecodedEvent, TxOverrides, TxProgress, TxSummary};
use ethers::abi::Token;

use crate::{
    error::{ChainError, RpcError},
    provider::ContractConnection,
};

/// Observer for the two ordered progress emissions. Never awaited on;
/// a slow observer cannot stall the transaction.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(TxProgress) + Send);

/// Run one state-changing method through estimate/submit/confirm and
/// return the single `event` it must have emitted.
pub async fn execute_with_event(
    conn: &dyn ContractConnection,
    method: &str,
    args: Vec<Token>,
    event: &str,
    confirmations: usize,
    overrides: &TxOverrides,
    progress: Option<ProgressFn<'_>>,
) -> Result<DecodedEvent, ChainError> {
    let summary = execute(conn, method, args, confirmations, overrides, progress).await?;
    extract_event(&summary, event)
}

/// Estimate, submit and confirm without event extraction.
pub async fn execute(
    conn: &dyn ContractConnection,
    method: &str,
    args: Vec<Token>,
    confirmations: usize,
    overrides: &TxOverrides,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<TxSummary, ChainError> {
    let submission_err = |source: RpcError| ChainError::Submission {
        description: method.to_string(),
        source,
    };

    let mut effective = overrides.clone();
    if effective.gas_limit.is_none() {
        let estimate = conn
            .estimate_gas(method, args.clone(), overrides)
            .await
            .map_err(submission_err)?;
        effective.gas_limit = Some(effective.effective_gas_limit(estimate));
    }

    let pending = conn
        .send(method, args, &effective)
        .await
        .map_err(submission_err)?;
    if let Some(observer) = progress.as_deref_mut() {
        observer(TxProgress::Submitted(pending.tx_hash()));
    }

    let summary = pending
        .wait(confirmations)
        .await
        .map_err(|source| ChainError::Confirmation {
            description: method.to_string(),
            source,
        })?;
    if let Some(observer) = progress.as_deref_mut() {
        observer(TxProgress::Confirmed(summary.clone()));
    }
    Ok(summary)
}

/// Deterministic single-event lookup: zero matches and multiple matches
/// are both surfaced explicitly rather than picking one silently.
pub fn extract_event(summary: &TxSummary, event: &str) -> Result<DecodedEvent, ChainError> {
    let mut matches = summary.events.iter().filter(|e| e.name == event);
    let first = matches.next().ok_or_else(|| ChainError::MissingEvent {
        event: event.to_string(),
        tx_hash: summary.tx_hash,
    })?;
    let extra = matches.count();
    if extra > 0 {
        return Err(ChainError::AmbiguousEvent {
            event: event.to_string(),
            tx_hash: summary.tx_hash,
            count: extra + 1,
        });
    }
    Ok(first.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use blockchat_ops_types::gas_limit_with_margin;
    use ethers::types::{H256, U256};

    use super::*;
    use crate::provider::PendingTx;

    struct FixedPending {
        summary: TxSummary,
    }

    #[async_trait]
    impl PendingTx for FixedPending {
        fn tx_hash(&self) -> H256 {
            self.summary.tx_hash
        }
        async fn wait(&self, _confirmations: usize) -> Result<TxSummary, RpcError> {
            Ok(self.summary.clone())
        }
    }

    struct FixedConn {
        estimate: U256,
        summary: TxSummary,
        sent_overrides: Mutex<Option<TxOverrides>>,
    }

    #[async_trait]
    impl ContractConnection for FixedConn {
        async fn call(&self, _method: &str, _args: Vec<Token>) -> Result<Vec<Token>, RpcError> {
            unimplemented!("reads are not part of the protocol")
        }

        async fn estimate_gas(
            &self,
            _method: &str,
            _args: Vec<Token>,
            _overrides: &TxOverrides,
        ) -> Result<U256, RpcError> {
            Ok(self.estimate)
        }

        async fn send(
            &self,
            _method: &str,
            _args: Vec<Token>,
            overrides: &TxOverrides,
        ) -> Result<Box<dyn PendingTx>, RpcError> {
            *self.sent_overrides.lock().unwrap() = Some(overrides.clone());
            Ok(Box::new(FixedPending {
                summary: self.summary.clone(),
            }))
        }

        async fn query_events(
            &self,
            _event: &str,
            _from_block: u64,
            _to_block: Option<u64>,
        ) -> Result<Vec<DecodedEvent>, RpcError> {
            Ok(vec![])
        }
    }

    fn summary_with(events: Vec<DecodedEvent>) -> TxSummary {
        TxSummary {
            tx_hash: H256::repeat_byte(0x99),
            block_number: 10,
            gas_used: U256::from(50_000u64),
            effective_gas_price: None,
            contract_address: None,
            events,
        }
    }

    fn message_created() -> DecodedEvent {
        DecodedEvent {
            name: "MessageCreated".to_string(),
            params: vec![("messageId".to_string(), Token::Uint(U256::one()))],
        }
    }

    #[tokio::test]
    async fn emits_submitted_then_confirmed_once_each() {
        let conn = FixedConn {
            estimate: U256::from(80_000u64),
            summary: summary_with(vec![message_created()]),
            sent_overrides: Mutex::new(None),
        };

        let mut seen = Vec::new();
        let mut observer = |p: TxProgress| seen.push(p);
        let event = execute_with_event(
            &conn,
            "createMessage",
            vec![],
            "MessageCreated",
            1,
            &TxOverrides::default(),
            Some(&mut observer),
        )
        .await
        .unwrap();

        assert_eq!(event.name, "MessageCreated");
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], TxProgress::Submitted(_)));
        assert!(matches!(seen[1], TxProgress::Confirmed(_)));

        // margined limit reached the provider
        let sent = conn.sent_overrides.lock().unwrap().clone().unwrap();
        assert_eq!(
            sent.gas_limit,
            Some(gas_limit_with_margin(U256::from(80_000u64)))
        );
    }

    #[tokio::test]
    async fn missing_event_is_an_error() {
        let conn = FixedConn {
            estimate: U256::from(80_000u64),
            summary: summary_with(vec![]),
            sent_overrides: Mutex::new(None),
        };

        let err = execute_with_event(
            &conn,
            "createMessage",
            vec![],
            "MessageCreated",
            1,
            &TxOverrides::default(),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChainError::MissingEvent { .. }));
    }

    #[tokio::test]
    async fn duplicate_events_are_ambiguous_not_last_wins() {
        let conn = FixedConn {
            estimate: U256::from(80_000u64),
            summary: summary_with(vec![message_created(), message_created()]),
            sent_overrides: Mutex::new(None),
        };

        let err = execute_with_event(
            &conn,
            "createMessage",
            vec![],
            "MessageCreated",
            1,
            &TxOverrides::default(),
            None,
        )
        .await
        .unwrap_err();
        match err {
            ChainError::AmbiguousEvent { count, .. } => assert_eq!(count, 2),
            other => panic!("expected AmbiguousEvent, got {other:?}"),
        }
    }
}
