//! Perfect Negotiation: both peers run the same code, and on an offer
//! collision the impolite side ignores the remote offer while the polite side
//! rolls its own back. Convergence takes at most one rollback.

use crate::NegotiationError;
use crate::media::{MediaEngine, MediaEngineFactory, MediaEventSender, SignalingState};
use duet_core::{Candidate, Role, SessionDescription};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// What happened to a remote description handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteDescriptionOutcome {
    /// Colliding offer dropped by the impolite side. Not an error.
    Ignored,
    /// Applied. For offers the caller must follow up with
    /// [`NegotiationEngine::answer`] and transmit the result.
    Applied { answer_required: bool },
}

#[derive(Debug, Default)]
struct NegotiationState {
    role: Role,
    making_offer: bool,
    ignore_offer: bool,
}

/// Owns the description lifecycle of one media session.
///
/// State sits behind a mutex that is never held across an `.await`; callers
/// are still expected to drive one operation at a time (see [`crate::Call`]).
pub struct NegotiationEngine {
    media: Mutex<Option<Arc<dyn MediaEngine>>>,
    state: Mutex<NegotiationState>,
}

impl NegotiationEngine {
    pub fn new(media: Arc<dyn MediaEngine>) -> Self {
        Self {
            media: Mutex::new(Some(media)),
            state: Mutex::new(NegotiationState::default()),
        }
    }

    /// Open a media session through `factory`, routing its events to `events`.
    pub async fn open(
        factory: &dyn MediaEngineFactory,
        events: MediaEventSender,
    ) -> Result<Self, NegotiationError> {
        let media = factory.create(events).await?;
        Ok(Self::new(media))
    }

    fn state(&self) -> MutexGuard<'_, NegotiationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> Result<Arc<dyn MediaEngine>, NegotiationError> {
        self.media
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(NegotiationError::NoSession)
    }

    pub fn role(&self) -> Role {
        self.state().role
    }

    pub fn set_role(&self, role: Role) {
        let mut state = self.state();
        if state.role != role {
            info!("Negotiation role changed: {} -> {}", state.role, role);
        }
        state.role = role;
    }

    pub fn is_making_offer(&self) -> bool {
        self.state().making_offer
    }

    pub fn is_ignoring_offer(&self) -> bool {
        self.state().ignore_offer
    }

    pub fn signaling_state(&self) -> Result<SignalingState, NegotiationError> {
        Ok(self.session()?.signaling_state())
    }

    /// Create an offer and install it locally. Never retries.
    pub async fn offer(&self) -> Result<SessionDescription, NegotiationError> {
        let media = self.session()?;

        self.state().making_offer = true;
        let result = async {
            let offer = media.create_offer().await?;
            media.set_local_description(offer.clone()).await?;
            Ok::<_, NegotiationError>(offer)
        }
        .await;
        self.state().making_offer = false;

        if let Err(e) = &result {
            warn!("Offer failed: {}", e);
        }
        result
    }

    /// Create an answer to the remote offer that was just applied.
    pub async fn answer(&self) -> Result<SessionDescription, NegotiationError> {
        let media = self.session()?;
        let answer = media.create_answer().await?;
        media.set_local_description(answer.clone()).await?;
        Ok(answer)
    }

    pub async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<RemoteDescriptionOutcome, NegotiationError> {
        let media = self.session()?;

        let offer_collision = {
            let mut state = self.state();
            let offer_collision = desc.is_offer()
                && (state.making_offer || media.signaling_state() != SignalingState::Stable);
            state.ignore_offer = state.role == Role::Impolite && offer_collision;
            if state.ignore_offer {
                info!("Ignoring colliding remote offer (impolite)");
                return Ok(RemoteDescriptionOutcome::Ignored);
            }
            offer_collision
        };

        if offer_collision {
            info!("Offer collision, rolling back local offer (polite)");
            if let Err(e) = media
                .set_local_description(SessionDescription::rollback())
                .await
            {
                debug!("Rollback reported an error, continuing: {}", e);
            }
        }

        let answer_required = desc.is_offer();
        media.set_remote_description(desc).await?;

        Ok(RemoteDescriptionOutcome::Applied { answer_required })
    }

    /// Hand a remote candidate to the media engine. Failures are expected
    /// (stale or duplicate candidates) and never surface.
    pub async fn add_remote_candidate(&self, candidate: Candidate) {
        let Ok(media) = self.session() else {
            debug!("Dropping remote candidate, no media session");
            return;
        };
        if let Err(e) = media.add_ice_candidate(candidate).await {
            debug!("Ignoring candidate: {}", e);
        }
    }

    /// Close and release the media session. Later calls fail with
    /// [`NegotiationError::NoSession`].
    pub async fn close(&self) {
        let media = self
            .media
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(media) = media else {
            return;
        };
        if let Err(e) = media.close().await {
            warn!("Failed to close media session: {}", e);
        }
    }
}
