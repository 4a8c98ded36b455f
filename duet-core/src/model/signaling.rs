use crate::model::client::ClientId;
use crate::model::description::{Candidate, SdpType, SessionDescription};
use crate::model::role::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Every message exchanged over the signaling channel.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalMessage {
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    /// `sdp` carries the candidate payload string.
    Candidate {
        sdp: String,
        #[serde(rename = "sdpMLineIndex")]
        sdp_m_line_index: u16,
        #[serde(rename = "sdpMid")]
        sdp_mid: String,
    },
    /// Sent by the relay only.
    Role {
        role: Role,
        #[serde(rename = "clientId")]
        client_id: ClientId,
    },
    /// Sent by the relay only, right before it closes a rejected connection.
    Error {
        reason: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalConversionError {
    #[error("rollback descriptions are local only")]
    Rollback,
    #[error("signal message is not a session description")]
    NotADescription,
}

impl SignalMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl TryFrom<SessionDescription> for SignalMessage {
    type Error = SignalConversionError;

    fn try_from(desc: SessionDescription) -> Result<Self, SignalConversionError> {
        match desc.kind {
            SdpType::Offer => Ok(SignalMessage::Offer { sdp: desc.sdp }),
            SdpType::Answer => Ok(SignalMessage::Answer { sdp: desc.sdp }),
            SdpType::Rollback => Err(SignalConversionError::Rollback),
        }
    }
}

impl TryFrom<SignalMessage> for SessionDescription {
    type Error = SignalConversionError;

    fn try_from(msg: SignalMessage) -> Result<Self, Self::Error> {
        match msg {
            SignalMessage::Offer { sdp } => Ok(SessionDescription::offer(sdp)),
            SignalMessage::Answer { sdp } => Ok(SessionDescription::answer(sdp)),
            _ => Err(SignalConversionError::NotADescription),
        }
    }
}

impl From<Candidate> for SignalMessage {
    fn from(c: Candidate) -> Self {
        SignalMessage::Candidate {
            sdp: c.payload,
            sdp_m_line_index: c.media_line_index,
            sdp_mid: c.mid,
        }
    }
}

/// Minimal view of an inbound frame: just enough for the relay to route it
/// without touching the rest of the payload.
#[derive(Debug, Deserialize)]
pub struct SignalEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
}

impl SignalEnvelope {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Only peer-to-peer negotiation traffic is forwarded.
    pub fn is_relayable(&self) -> bool {
        matches!(self.kind.as_str(), "offer" | "answer" | "candidate")
    }
}
