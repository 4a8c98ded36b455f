use duet_core::InvalidSessionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("session is full ({capacity} participants)")]
    SessionFull { capacity: usize },

    #[error("session task has shut down")]
    SessionClosed,

    #[error(transparent)]
    InvalidSessionId(#[from] InvalidSessionId),

    #[error("failed to encode signal message: {0}")]
    Encode(#[from] serde_json::Error),
}
