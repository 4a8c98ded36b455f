//! Seam between the negotiation logic and whatever actually moves media.
//!
//! The negotiation engine only ever sees [`MediaEngine`]; concrete engines are
//! built by an injected [`MediaEngineFactory`] so tests can swap in doubles.

mod webrtc_engine;

pub use webrtc_engine::{DEFAULT_STUN_ADDR, MediaConfig, WebRtcEngineFactory};

use crate::MediaError;
use async_trait::async_trait;
use duet_core::{Candidate, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Offer/answer progress as reported by the media engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

/// Transport connectivity surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Things a media engine reports on its own initiative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    LocalCandidate(Candidate),
    ConnectionState(ConnectionState),
    NegotiationNeeded,
}

pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;

#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError>;

    async fn create_answer(&self) -> Result<SessionDescription, MediaError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError>;

    async fn add_ice_candidate(&self, candidate: Candidate) -> Result<(), MediaError>;

    fn signaling_state(&self) -> SignalingState;

    async fn close(&self) -> Result<(), MediaError>;
}

#[async_trait]
pub trait MediaEngineFactory: Send + Sync {
    /// Build a fresh media session that reports through `events`.
    async fn create(&self, events: MediaEventSender) -> Result<Arc<dyn MediaEngine>, MediaError>;
}
