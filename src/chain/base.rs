use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{ChatError, ChatResult};

/// A signing identity for transaction submission.
///
/// Credentials are always supplied explicitly (constructor or environment);
/// there is deliberately no built-in default account.
#[derive(Clone)]
pub struct Signer {
    address: String,
    credential: String,
}

impl Signer {
    pub fn new(address: impl Into<String>, credential: impl Into<String>) -> ChatResult<Self> {
        let address = address.into();
        let credential = credential.into();
        if !address.starts_with("0x") || address.len() < 3 {
            return Err(ChatError::Signer(format!("invalid address: {address}")));
        }
        if credential.is_empty() {
            return Err(ChatError::Signer("empty credential".to_string()));
        }
        Ok(Signer {
            address,
            credential,
        })
    }

    /// Read the signer from `CHAINCHAT_SIGNER_ADDRESS` and
    /// `CHAINCHAT_SIGNER_CREDENTIAL`.
    pub fn from_env() -> ChatResult<Self> {
        let address = std::env::var("CHAINCHAT_SIGNER_ADDRESS")
            .map_err(|_| ChatError::MissingEnv("CHAINCHAT_SIGNER_ADDRESS"))?;
        let credential = std::env::var("CHAINCHAT_SIGNER_CREDENTIAL")
            .map_err(|_| ChatError::MissingEnv("CHAINCHAT_SIGNER_CREDENTIAL"))?;
        Signer::new(address, credential)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn credential(&self) -> &str {
        &self.credential
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// A transaction payload that has not been submitted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    pub payload: Value,
}

impl UnsignedTransaction {
    pub fn new(payload: Value) -> Self {
        UnsignedTransaction { payload }
    }

    /// Entry-function call payload, the common case for assistant-proposed
    /// transactions.
    pub fn entry_function(
        function: impl Into<String>,
        type_arguments: Vec<String>,
        arguments: Vec<Value>,
    ) -> Self {
        UnsignedTransaction {
            payload: json!({
                "type": "entry_function_payload",
                "function": function.into(),
                "type_arguments": type_arguments,
                "arguments": arguments,
            }),
        }
    }
}

/// Result of submitting a transaction to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub hash: String,
    pub gas_unit_price: u64,
}

/// Terminal confirmation of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub success: bool,
    pub gas_used: u64,
    /// Ledger version at which the transaction was included.
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub block_height: u64,
}

/// Network client surface used by the transaction executor.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Sign and submit a transaction, returning its pending hash.
    async fn sign_and_submit(
        &self,
        signer: &Signer,
        txn: &UnsignedTransaction,
    ) -> ChatResult<Submission>;

    /// Wait until the network confirms inclusion, up to `timeout`.
    async fn wait_for_inclusion(&self, hash: &str, timeout: Duration) -> ChatResult<Confirmation>;

    /// Resolve the block containing the given ledger version.
    async fn get_block_by_version(&self, version: u64) -> ChatResult<BlockInfo>;
}
