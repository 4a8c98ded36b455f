use crate::{RelayConfig, RelayError, SessionManager};
use axum::extract::ws::Utf8Bytes;
use duet_core::SignalMessage;

/// Shared state of the WebSocket surface.
#[derive(Clone)]
pub struct SignalingService {
    sessions: SessionManager,
    outbound_buffer: usize,
}

impl SignalingService {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            sessions: SessionManager::new(config.session_capacity, config.command_buffer),
            outbound_buffer: config.outbound_buffer.max(1),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn outbound_buffer(&self) -> usize {
        self.outbound_buffer
    }
}

/// Serialize a relay-originated message into a text frame payload.
pub fn encode_signal(msg: &SignalMessage) -> Result<Utf8Bytes, RelayError> {
    Ok(msg.to_json()?.into())
}
