use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failure reported by a media engine.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media engine rejected the operation: {0}")]
    Rejected(String),

    #[error("unsupported session description type: {0}")]
    UnsupportedDescription(String),

    #[error(transparent)]
    WebRtc(#[from] webrtc::Error),
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("no media session is open")]
    NoSession,

    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to reach relay at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("call task is gone")]
    CallClosed,
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}
