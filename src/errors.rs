use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("transcript must be non-empty and end with a user message")]
    InvalidTranscript,

    #[error("malformed stream frame: {0}")]
    Protocol(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("transaction not confirmed within {0:?}")]
    ConfirmationTimeout(std::time::Duration),

    #[error("invalid signer: {0}")]
    Signer(String),

    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),
}

pub type ChatResult<T> = Result<T, ChatError>;
