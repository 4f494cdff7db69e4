//! Configuration is constructed explicitly at the application root and
//! passed into the components that need it; nothing reads globals at use
//! time.

use crate::errors::{ChatError, ChatResult};

const DEFAULT_CALLER: &str = "0x0";

/// Settings for one chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL of the assistant backend.
    pub backend_url: String,
    /// Base URL of the blockchain node gateway.
    pub node_url: String,
    /// Caller identity forwarded to the backend, the connected wallet
    /// address when one exists.
    pub caller: String,
}

impl ChatConfig {
    pub fn new(backend_url: impl Into<String>, node_url: impl Into<String>) -> Self {
        ChatConfig {
            backend_url: backend_url.into(),
            node_url: node_url.into(),
            caller: DEFAULT_CALLER.to_string(),
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    /// Read configuration from `CHAINCHAT_BACKEND_URL`, `CHAINCHAT_NODE_URL`
    /// and optionally `CHAINCHAT_CALLER`.
    pub fn from_env() -> ChatResult<Self> {
        let backend_url = std::env::var("CHAINCHAT_BACKEND_URL")
            .map_err(|_| ChatError::MissingEnv("CHAINCHAT_BACKEND_URL"))?;
        let node_url = std::env::var("CHAINCHAT_NODE_URL")
            .map_err(|_| ChatError::MissingEnv("CHAINCHAT_NODE_URL"))?;
        let caller =
            std::env::var("CHAINCHAT_CALLER").unwrap_or_else(|_| DEFAULT_CALLER.to_string());
        Ok(ChatConfig {
            backend_url,
            node_url,
            caller,
        })
    }
}
