//! Error types surfaced by the server's collaborators

use std::time::Duration;
use thiserror::Error;

/// Infrastructure failures from the score ledger.
///
/// These are passed to the caller unchanged; nothing in the server retries them.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt ledger record on line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode score record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("ledger did not respond within {0:?}")]
    Timeout(Duration),

    #[error("ledger is unwritable after a failed rollback of {0}")]
    Poisoned(String),

    #[error("ledger append task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Validation failures from the user directory. The display text is the
/// reason reported back to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid password")]
    InvalidPassword,
}
