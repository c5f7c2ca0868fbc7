use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("connect error: {0}")]
    Connect(#[source] io::Error),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("stream error: {0}")]
    Stream(#[source] io::Error),

    #[error("stream ended after {transferred} of {expected} bytes")]
    Incomplete { transferred: u64, expected: u64 },

    #[error("transfer cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl TransferError {
    /// True for the cooperative-cancellation terminal, false for every
    /// failure-class terminal.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }
}
