//! Typed client over one deployed BlockChat proxy. The configuration is
//! immutable and complete at construction; there is no connect-later
//! state to null-check before every call.

use blockchat_ops_types::{DecodedEvent, TxOverrides};
use ethers::{
    abi::Token,
    types::{Address, H160, H256, U256},
};

use crate::{
    error::{ChainError, RpcError},
    protocol::{self, ProgressFn},
    provider::ContractConnection,
};

/// 20-byte keccak-derived recipient key (`bytes20` on-chain).
pub type RecipientHash = H160;

/// `MessageCreated(messageId, createDate, sender, recipientList, content)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageCreated {
    pub message_id: U256,
    pub create_date: U256,
    pub sender: Address,
    pub recipients: Vec<RecipientHash>,
    pub content: String,
}

impl MessageCreated {
    const EVENT: &'static str = "MessageCreated";

    fn from_event(event: &DecodedEvent) -> Result<Self, ChainError> {
        let malformed = |param| ChainError::MalformedEvent {
            event: Self::EVENT.to_string(),
            param,
        };
        Ok(Self {
            message_id: uint_param(event, "messageId").ok_or_else(|| malformed("messageId"))?,
            create_date: uint_param(event, "createDate").ok_or_else(|| malformed("createDate"))?,
            sender: address_param(event, "sender").ok_or_else(|| malformed("sender"))?,
            recipients: recipient_list_param(event, "recipientList")
                .ok_or_else(|| malformed("recipientList"))?,
            content: string_param(event, "content").ok_or_else(|| malformed("content"))?,
        })
    }
}

/// `DataUploaded(dataHash, sender, content)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUploaded {
    pub data_hash: H256,
    pub sender: Address,
    pub content: String,
}

impl DataUploaded {
    const EVENT: &'static str = "DataUploaded";

    fn from_event(event: &DecodedEvent) -> Result<Self, ChainError> {
        let malformed = |param| ChainError::MalformedEvent {
            event: Self::EVENT.to_string(),
            param,
        };
        Ok(Self {
            data_hash: bytes32_param(event, "dataHash").ok_or_else(|| malformed("dataHash"))?,
            sender: address_param(event, "sender").ok_or_else(|| malformed("sender"))?,
            content: string_param(event, "content").ok_or_else(|| malformed("content"))?,
        })
    }
}

/// On-chain record of one message, as stored in `messageMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub message_hash: H256,
    pub create_block: U256,
}

impl StoredMessage {
    fn from_fields(fields: &[Token]) -> Result<Self, RpcError> {
        match fields {
            [Token::FixedBytes(bytes), Token::Uint(block)] if bytes.len() == 32 => Ok(Self {
                message_hash: H256::from_slice(bytes),
                create_block: *block,
            }),
            other => Err(RpcError::fatal(format!(
                "unexpected message shape: {other:?}"
            ))),
        }
    }
}

/// Client over one deployed proxy, constructed once with everything it
/// needs.
pub struct MessageClient<C> {
    conn: C,
    confirmations: usize,
}

impl<C: ContractConnection> MessageClient<C> {
    pub fn new(conn: C, confirmations: usize) -> Self {
        Self {
            conn,
            confirmations,
        }
    }

    /* ---------------- read functions ---------------- */
    // Reads return RpcError so tasks can route them through the
    // executor's retrying `call`.

    pub async fn implementation_version(&self) -> Result<String, RpcError> {
        let tokens = self.conn.call("implementationVersion", vec![]).await?;
        expect_string(tokens)
    }

    pub async fn message_length(&self) -> Result<U256, RpcError> {
        let tokens = self.conn.call("messageLength", vec![]).await?;
        expect_uint(tokens)
    }

    pub async fn recipient_message_count(
        &self,
        recipient: RecipientHash,
    ) -> Result<U256, RpcError> {
        let tokens = self
            .conn
            .call(
                "getRecipientMessageListLength",
                vec![recipient_token(recipient)],
            )
            .await?;
        expect_uint(tokens)
    }

    /// Stored record for one message id. The `messageMap` getter
    /// flattens the struct into (messageHash, createBlock).
    pub async fn message(&self, message_id: U256) -> Result<StoredMessage, RpcError> {
        let tokens = self
            .conn
            .call("messageMap", vec![Token::Uint(message_id)])
            .await?;
        StoredMessage::from_fields(&tokens)
    }

    pub async fn batch_messages(
        &self,
        message_ids: &[U256],
    ) -> Result<Vec<StoredMessage>, RpcError> {
        let ids = message_ids.iter().map(|id| Token::Uint(*id)).collect();
        let mut tokens = self.conn.call("batchMessage", vec![Token::Array(ids)]).await?;
        match tokens.pop() {
            Some(Token::Array(items)) if tokens.is_empty() => items
                .iter()
                .map(|item| match item {
                    Token::Tuple(fields) => StoredMessage::from_fields(fields),
                    other => Err(RpcError::fatal(format!(
                        "unexpected message shape: {other:?}"
                    ))),
                })
                .collect(),
            other => Err(RpcError::fatal(format!(
                "unexpected return shape: {other:?}"
            ))),
        }
    }

    /// Block at which `operator` uploaded the data behind `data_hash`,
    /// zero when nothing was uploaded.
    pub async fn data_map(
        &self,
        operator: Address,
        data_hash: H256,
    ) -> Result<U256, RpcError> {
        let tokens = self
            .conn
            .call(
                "dataMap",
                vec![
                    Token::Address(operator),
                    Token::FixedBytes(data_hash.as_bytes().to_vec()),
                ],
            )
            .await?;
        expect_uint(tokens)
    }

    /* ---------------- transaction functions ---------------- */

    pub async fn create_message(
        &self,
        recipient: RecipientHash,
        content: &str,
        overrides: &TxOverrides,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<MessageCreated, ChainError> {
        let event = protocol::execute_with_event(
            &self.conn,
            "createMessage",
            vec![
                recipient_token(recipient),
                Token::String(content.to_string()),
            ],
            MessageCreated::EVENT,
            self.confirmations,
            overrides,
            progress,
        )
        .await?;
        MessageCreated::from_event(&event)
    }

    pub async fn create_message_to_list(
        &self,
        recipients: &[RecipientHash],
        content: &str,
        overrides: &TxOverrides,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<MessageCreated, ChainError> {
        let list = recipients.iter().copied().map(recipient_token).collect();
        let event = protocol::execute_with_event(
            &self.conn,
            "createMessageToList",
            vec![Token::Array(list), Token::String(content.to_string())],
            MessageCreated::EVENT,
            self.confirmations,
            overrides,
            progress,
        )
        .await?;
        MessageCreated::from_event(&event)
    }

    pub async fn create_message_with_data(
        &self,
        recipient: RecipientHash,
        content: &str,
        data: &[u8],
        overrides: &TxOverrides,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<MessageCreated, ChainError> {
        let event = protocol::execute_with_event(
            &self.conn,
            "createMessageWithData",
            vec![
                recipient_token(recipient),
                Token::String(content.to_string()),
                Token::Bytes(data.to_vec()),
            ],
            MessageCreated::EVENT,
            self.confirmations,
            overrides,
            progress,
        )
        .await?;
        MessageCreated::from_event(&event)
    }

    pub async fn upload_data(
        &self,
        data_hash: H256,
        content: &str,
        overrides: &TxOverrides,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<DataUploaded, ChainError> {
        let event = protocol::execute_with_event(
            &self.conn,
            "uploadData",
            vec![
                Token::FixedBytes(data_hash.as_bytes().to_vec()),
                Token::String(content.to_string()),
            ],
            DataUploaded::EVENT,
            self.confirmations,
            overrides,
            progress,
        )
        .await?;
        DataUploaded::from_event(&event)
    }

    /* ---------------- event scan ---------------- */

    /// All `MessageCreated` events since `from_block`; callers pass the
    /// registry record's `fromBlock` as the lower bound.
    pub async fn messages_since(&self, from_block: u64) -> Result<Vec<MessageCreated>, ChainError> {
        let events = self
            .conn
            .query_events(MessageCreated::EVENT, from_block, None)
            .await
            .map_err(|source| ChainError::Call {
                description: "queryFilter MessageCreated".to_string(),
                source,
            })?;
        events.iter().map(MessageCreated::from_event).collect()
    }
}

fn recipient_token(recipient: RecipientHash) -> Token {
    Token::FixedBytes(recipient.as_bytes().to_vec())
}

fn expect_string(mut tokens: Vec<Token>) -> Result<String, RpcError> {
    match tokens.pop() {
        Some(Token::String(s)) if tokens.is_empty() => Ok(s),
        other => Err(RpcError::fatal(format!(
            "unexpected return shape: {other:?}"
        ))),
    }
}

fn expect_uint(mut tokens: Vec<Token>) -> Result<U256, RpcError> {
    match tokens.pop() {
        Some(Token::Uint(value)) if tokens.is_empty() => Ok(value),
        other => Err(RpcError::fatal(format!(
            "unexpected return shape: {other:?}"
        ))),
    }
}

fn uint_param(event: &DecodedEvent, name: &str) -> Option<U256> {
    match event.param(name)? {
        Token::Uint(value) => Some(*value),
        _ => None,
    }
}

fn address_param(event: &DecodedEvent, name: &str) -> Option<Address> {
    match event.param(name)? {
        Token::Address(addr) => Some(*addr),
        _ => None,
    }
}

fn string_param(event: &DecodedEvent, name: &str) -> Option<String> {
    match event.param(name)? {
        Token::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn bytes32_param(event: &DecodedEvent, name: &str) -> Option<H256> {
    match event.param(name)? {
        Token::FixedBytes(bytes) if bytes.len() == 32 => Some(H256::from_slice(bytes)),
        _ => None,
    }
}

fn recipient_list_param(event: &DecodedEvent, name: &str) -> Option<Vec<RecipientHash>> {
    match event.param(name)? {
        Token::Array(items) => items
            .iter()
            .map(|item| match item {
                Token::FixedBytes(bytes) if bytes.len() == 20 => {
                    Some(RecipientHash::from_slice(bytes))
                }
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use blockchat_ops_types::TxSummary;

    use super::*;
    use crate::provider::PendingTx;

    fn created_event(message_id: u64) -> DecodedEvent {
        DecodedEvent {
            name: "MessageCreated".to_string(),
            params: vec![
                ("messageId".to_string(), Token::Uint(U256::from(message_id))),
                ("createDate".to_string(), Token::Uint(U256::from(1700u64))),
                (
                    "sender".to_string(),
                    Token::Address(Address::repeat_byte(0x0a)),
                ),
                (
                    "recipientList".to_string(),
                    Token::Array(vec![Token::FixedBytes(vec![0x0b; 20])]),
                ),
                ("content".to_string(), Token::String("hello".to_string())),
            ],
        }
    }

    struct ScriptedConn {
        call_result: Vec<Token>,
        tx_events: Vec<DecodedEvent>,
        queried: Mutex<Option<(String, u64)>>,
    }

    struct ScriptedPending {
        summary: TxSummary,
    }

    #[async_trait]
    impl PendingTx for ScriptedPending {
        fn tx_hash(&self) -> H256 {
            self.summary.tx_hash
        }
        async fn wait(&self, _confirmations: usize) -> Result<TxSummary, RpcError> {
            Ok(self.summary.clone())
        }
    }

    #[async_trait]
    impl ContractConnection for ScriptedConn {
        async fn call(&self, _method: &str, _args: Vec<Token>) -> Result<Vec<Token>, RpcError> {
            Ok(self.call_result.clone())
        }

        async fn estimate_gas(
            &self,
            _method: &str,
            _args: Vec<Token>,
            _overrides: &TxOverrides,
        ) -> Result<U256, RpcError> {
            Ok(U256::from(60_000u64))
        }

        async fn send(
            &self,
            _method: &str,
            _args: Vec<Token>,
            _overrides: &TxOverrides,
        ) -> Result<Box<dyn PendingTx>, RpcError> {
            Ok(Box::new(ScriptedPending {
                summary: TxSummary {
                    tx_hash: H256::repeat_byte(0x01),
                    block_number: 5,
                    gas_used: U256::from(55_000u64),
                    effective_gas_price: None,
                    contract_address: None,
                    events: self.tx_events.clone(),
                },
            }))
        }

        async fn query_events(
            &self,
            event: &str,
            from_block: u64,
            _to_block: Option<u64>,
        ) -> Result<Vec<DecodedEvent>, RpcError> {
            *self.queried.lock().unwrap() = Some((event.to_string(), from_block));
            Ok(self.tx_events.clone())
        }
    }

    #[tokio::test]
    async fn create_message_returns_typed_event() {
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![],
                tx_events: vec![created_event(7)],
                queried: Mutex::new(None),
            },
            1,
        );

        let created = client
            .create_message(
                RecipientHash::repeat_byte(0x0b),
                "hello",
                &TxOverrides::default(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(created.message_id, U256::from(7u64));
        assert_eq!(created.sender, Address::repeat_byte(0x0a));
        assert_eq!(created.recipients, vec![RecipientHash::repeat_byte(0x0b)]);
        assert_eq!(created.content, "hello");
    }

    #[tokio::test]
    async fn version_read_decodes_string() {
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![Token::String("2.0.0".to_string())],
                tx_events: vec![],
                queried: Mutex::new(None),
            },
            1,
        );
        assert_eq!(client.implementation_version().await.unwrap(), "2.0.0");
    }

    #[tokio::test]
    async fn version_read_rejects_wrong_shape() {
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![Token::Uint(U256::one())],
                tx_events: vec![],
                queried: Mutex::new(None),
            },
            1,
        );
        assert!(client.implementation_version().await.is_err());
    }

    #[tokio::test]
    async fn create_message_with_data_returns_typed_event() {
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![],
                tx_events: vec![created_event(9)],
                queried: Mutex::new(None),
            },
            1,
        );

        let created = client
            .create_message_with_data(
                RecipientHash::repeat_byte(0x0b),
                "hello",
                b"attachment",
                &TxOverrides::default(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(created.message_id, U256::from(9u64));
    }

    #[tokio::test]
    async fn message_read_decodes_flattened_struct() {
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![
                    Token::FixedBytes(vec![0x5a; 32]),
                    Token::Uint(U256::from(321u64)),
                ],
                tx_events: vec![],
                queried: Mutex::new(None),
            },
            1,
        );

        let stored = client.message(U256::one()).await.unwrap();
        assert_eq!(stored.message_hash, H256::repeat_byte(0x5a));
        assert_eq!(stored.create_block, U256::from(321u64));
    }

    #[tokio::test]
    async fn batch_messages_decodes_tuple_array() {
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![Token::Array(vec![
                    Token::Tuple(vec![
                        Token::FixedBytes(vec![0x01; 32]),
                        Token::Uint(U256::from(10u64)),
                    ]),
                    Token::Tuple(vec![
                        Token::FixedBytes(vec![0x02; 32]),
                        Token::Uint(U256::from(20u64)),
                    ]),
                ])],
                tx_events: vec![],
                queried: Mutex::new(None),
            },
            1,
        );

        let stored = client
            .batch_messages(&[U256::one(), U256::from(2u64)])
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].message_hash, H256::repeat_byte(0x01));
        assert_eq!(stored[1].create_block, U256::from(20u64));
    }

    #[tokio::test]
    async fn message_read_rejects_wrong_shape() {
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![Token::String("nope".to_string())],
                tx_events: vec![],
                queried: Mutex::new(None),
            },
            1,
        );
        assert!(client.message(U256::one()).await.is_err());
        assert!(client.batch_messages(&[U256::one()]).await.is_err());
    }

    #[tokio::test]
    async fn data_map_returns_upload_block() {
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![Token::Uint(U256::from(777u64))],
                tx_events: vec![],
                queried: Mutex::new(None),
            },
            1,
        );
        let block = client
            .data_map(Address::repeat_byte(0x0a), H256::repeat_byte(0x33))
            .await
            .unwrap();
        assert_eq!(block, U256::from(777u64));
    }

    #[tokio::test]
    async fn messages_since_scans_from_lower_bound() {
        let conn = ScriptedConn {
            call_result: vec![],
            tx_events: vec![created_event(1), created_event(2)],
            queried: Mutex::new(None),
        };
        let client = MessageClient::new(conn, 1);

        let messages = client.messages_since(1234).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            *client.conn.queried.lock().unwrap(),
            Some(("MessageCreated".to_string(), 1234))
        );
    }

    #[tokio::test]
    async fn malformed_event_is_reported() {
        let bad = DecodedEvent {
            name: "MessageCreated".to_string(),
            params: vec![("messageId".to_string(), Token::Uint(U256::one()))],
        };
        let client = MessageClient::new(
            ScriptedConn {
                call_result: vec![],
                tx_events: vec![bad],
                queried: Mutex::new(None),
            },
            1,
        );
        let err = client
            .create_message(
                RecipientHash::zero(),
                "hi",
                &TxOverrides::default(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::MalformedEvent { .. }));
    }
}
