use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::base::{BlockInfo, ChainClient, Confirmation, Signer, Submission, UnsignedTransaction};
use crate::errors::{ChatError, ChatResult};

/// A mock chain client that returns pre-scripted responses for testing.
#[derive(Default)]
pub struct MockChainClient {
    submissions: Mutex<VecDeque<ChatResult<Submission>>>,
    confirmations: Mutex<VecDeque<ChatResult<Confirmation>>>,
    blocks: Mutex<VecDeque<ChatResult<BlockInfo>>>,
    calls: Mutex<Vec<String>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_submission(self, result: ChatResult<Submission>) -> Self {
        self.submissions.lock().unwrap().push_back(result);
        self
    }

    pub fn with_confirmation(self, result: ChatResult<Confirmation>) -> Self {
        self.confirmations.lock().unwrap().push_back(result);
        self
    }

    pub fn with_block(self, result: ChatResult<BlockInfo>) -> Self {
        self.blocks.lock().unwrap().push_back(result);
        self
    }

    /// Names of the trait methods invoked so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next<T>(&self, queue: &Mutex<VecDeque<ChatResult<T>>>, what: &str) -> ChatResult<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::Protocol(format!("no scripted {what}"))))
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn sign_and_submit(
        &self,
        _signer: &Signer,
        _txn: &UnsignedTransaction,
    ) -> ChatResult<Submission> {
        self.calls.lock().unwrap().push("sign_and_submit".to_string());
        self.next(&self.submissions, "submission")
    }

    async fn wait_for_inclusion(&self, _hash: &str, _timeout: Duration) -> ChatResult<Confirmation> {
        self.calls
            .lock()
            .unwrap()
            .push("wait_for_inclusion".to_string());
        self.next(&self.confirmations, "confirmation")
    }

    async fn get_block_by_version(&self, _version: u64) -> ChatResult<BlockInfo> {
        self.calls
            .lock()
            .unwrap()
            .push("get_block_by_version".to_string());
        self.next(&self.blocks, "block")
    }
}
