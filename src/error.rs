//! Error kinds for each boundary in the turn loop and session controller.
//!
//! Nothing here is retried automatically — see [`crate::loop_`] and
//! [`crate::session`] module docs for where each variant surfaces.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolExecError {
    #[error("{0}")]
    Failed(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{0}")]
    Failed(String),
    #[error("timed out")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Interface-only: no concrete provider ships in this crate (see
/// [`crate::provider`]). `MockProvider` and any adapter you bring return this.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("api error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("cancelled")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("listener error: {0}")]
    Listener(String),
}

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("{0}")]
    Loop(String),
    #[error("listener error: {0}")]
    Listener(String),
}

impl From<LoopError> for SessionError {
    fn from(err: LoopError) -> Self {
        match err {
            LoopError::Listener(msg) => SessionError::Listener(msg),
            other => SessionError::Loop(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
