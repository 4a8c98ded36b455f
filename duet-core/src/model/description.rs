use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Rollback,
}

/// One side's proposed media configuration. Superseded, never mutated.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionDescription {
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    /// Local rollback marker; carries no SDP and is never sent to a peer.
    pub fn rollback() -> Self {
        Self {
            kind: SdpType::Rollback,
            sdp: String::new(),
        }
    }

    pub fn is_offer(&self) -> bool {
        self.kind == SdpType::Offer
    }
}

/// A discovered network path. Order is irrelevant, duplicates are tolerated.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct Candidate {
    pub payload: String,
    pub media_line_index: u16,
    pub mid: String,
}
