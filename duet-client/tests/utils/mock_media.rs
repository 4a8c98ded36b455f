use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use duet_client::media::MediaEventSender;
use duet_client::{MediaEngine, MediaEngineFactory, MediaError, MediaEvent, SignalingState};
use duet_core::{Candidate, SdpType, SessionDescription};
use tokio::sync::Notify;

/// Every call the negotiation layer made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    CreateOffer,
    CreateAnswer,
    SetLocal(SdpType),
    SetRemote(SdpType),
    AddCandidate(String),
    Close,
}

#[derive(Default)]
struct MockState {
    signaling: Option<SignalingState>,
    calls: Vec<MediaCall>,
    candidates: HashSet<Candidate>,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    descriptions_made: usize,
    fail_next_offer: bool,
    implicit_rollback: bool,
    offer_gate: Option<Arc<Notify>>,
    events: Option<MediaEventSender>,
}

/// Media engine double implementing the standard offer/answer state machine.
///
/// SDP starting with `invalid` is rejected, as is the candidate `bogus`.
pub struct MockMediaEngine {
    label: String,
    state: Mutex<MockState>,
}

impl MockMediaEngine {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_owned(),
            state: Mutex::new(MockState::default()),
        })
    }

    /// Engine without explicit rollback: rollback errors, but a remote offer
    /// over a pending local one is accepted.
    pub fn with_implicit_rollback(label: &str) -> Arc<Self> {
        let engine = Self::new(label);
        engine.lock().implicit_rollback = true;
        engine
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    /// The next `create_offer` fails.
    pub fn fail_next_offer(&self) {
        self.lock().fail_next_offer = true;
    }

    /// Park every `create_offer` until the returned [`Notify`] fires.
    pub fn hold_offers(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().offer_gate = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.lock().calls.clone()
    }

    pub fn rolled_back(&self) -> bool {
        self.calls()
            .contains(&MediaCall::SetLocal(SdpType::Rollback))
    }

    pub fn candidate_count(&self) -> usize {
        self.lock().candidates.len()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.lock().local.clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.lock().remote.clone()
    }

    /// Push an event as if the engine produced it.
    pub fn emit(&self, event: MediaEvent) {
        if let Some(tx) = &self.lock().events {
            let _ = tx.send(event);
        }
    }

    fn next_sdp(&self, kind: &str) -> String {
        let mut state = self.lock();
        state.descriptions_made += 1;
        format!("{}-{}-{}", self.label, kind, state.descriptions_made)
    }

    fn current(&self) -> SignalingState {
        self.lock().signaling.unwrap_or(SignalingState::Stable)
    }
}

fn rejected(msg: impl Into<String>) -> MediaError {
    MediaError::Rejected(msg.into())
}

#[async_trait]
impl MediaEngine for MockMediaEngine {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError> {
        let gate = {
            let mut state = self.lock();
            state.calls.push(MediaCall::CreateOffer);
            state.offer_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        {
            let mut state = self.lock();
            if state.fail_next_offer {
                state.fail_next_offer = false;
                return Err(rejected("simulated offer failure"));
            }
        }
        if self.current() == SignalingState::Closed {
            return Err(rejected("closed"));
        }
        Ok(SessionDescription::offer(self.next_sdp("offer")))
    }

    async fn create_answer(&self) -> Result<SessionDescription, MediaError> {
        self.lock().calls.push(MediaCall::CreateAnswer);
        if self.current() != SignalingState::HaveRemoteOffer {
            return Err(rejected("no remote offer to answer"));
        }
        Ok(SessionDescription::answer(self.next_sdp("answer")))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        let mut state = self.lock();
        state.calls.push(MediaCall::SetLocal(desc.kind));
        let current = state.signaling.unwrap_or(SignalingState::Stable);

        let next = match (desc.kind, current) {
            (SdpType::Offer, SignalingState::Stable) => SignalingState::HaveLocalOffer,
            (SdpType::Answer, SignalingState::HaveRemoteOffer) => SignalingState::Stable,
            (SdpType::Rollback, SignalingState::HaveLocalOffer) if !state.implicit_rollback => {
                state.local = None;
                SignalingState::Stable
            }
            (kind, current) => {
                return Err(rejected(format!("cannot set local {:?} in {:?}", kind, current)));
            }
        };

        if desc.kind != SdpType::Rollback {
            state.local = Some(desc);
        }
        state.signaling = Some(next);
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        let mut state = self.lock();
        state.calls.push(MediaCall::SetRemote(desc.kind));
        if desc.sdp.starts_with("invalid") {
            return Err(rejected("unparseable sdp"));
        }
        let current = state.signaling.unwrap_or(SignalingState::Stable);

        let next = match (desc.kind, current) {
            (SdpType::Offer, SignalingState::Stable) => SignalingState::HaveRemoteOffer,
            (SdpType::Offer, SignalingState::HaveLocalOffer) if state.implicit_rollback => {
                state.local = None;
                SignalingState::HaveRemoteOffer
            }
            (SdpType::Answer, SignalingState::HaveLocalOffer) => SignalingState::Stable,
            (kind, current) => {
                return Err(rejected(format!("cannot set remote {:?} in {:?}", kind, current)));
            }
        };

        state.remote = Some(desc);
        state.signaling = Some(next);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Candidate) -> Result<(), MediaError> {
        let mut state = self.lock();
        state
            .calls
            .push(MediaCall::AddCandidate(candidate.payload.clone()));
        if candidate.payload == "bogus" {
            return Err(rejected("bad candidate"));
        }
        state.candidates.insert(candidate);
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        self.current()
    }

    async fn close(&self) -> Result<(), MediaError> {
        let mut state = self.lock();
        state.calls.push(MediaCall::Close);
        state.signaling = Some(SignalingState::Closed);
        Ok(())
    }
}

/// Factory handing out one pre-built mock, wiring its event sender.
pub struct MockMediaFactory {
    engine: Arc<MockMediaEngine>,
}

impl MockMediaFactory {
    pub fn new(engine: Arc<MockMediaEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl MediaEngineFactory for MockMediaFactory {
    async fn create(&self, events: MediaEventSender) -> Result<Arc<dyn MediaEngine>, MediaError> {
        self.engine.lock().events = Some(events);
        Ok(self.engine.clone())
    }
}

pub fn test_candidate(payload: &str) -> Candidate {
    Candidate {
        payload: payload.to_owned(),
        media_line_index: 0,
        mid: "0".to_owned(),
    }
}
