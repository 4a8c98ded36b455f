use duet_core::{Candidate, SessionDescription, SignalMessage};
use tracing::{debug, info, warn};

use crate::call::{Call, CallEvent};
use crate::negotiation::RemoteDescriptionOutcome;

impl Call {
    pub(super) async fn handle_signal(&mut self, msg: SignalMessage) {
        match msg {
            SignalMessage::Role { role, client_id } => {
                info!("Relay assigned {} as {}", client_id, role);
                self.engine.set_role(role);
                self.emit(CallEvent::RoleAssigned { role, client_id });
            }

            SignalMessage::Offer { sdp } => {
                info!("Received Offer from peer");
                self.handle_remote_description(SessionDescription::offer(sdp))
                    .await;
            }

            SignalMessage::Answer { sdp } => {
                info!("Received Answer from peer");
                self.handle_remote_description(SessionDescription::answer(sdp))
                    .await;
            }

            SignalMessage::Candidate {
                sdp,
                sdp_m_line_index,
                sdp_mid,
            } => {
                debug!("Adding remote candidate: {}", sdp);
                self.engine
                    .add_remote_candidate(Candidate {
                        payload: sdp,
                        media_line_index: sdp_m_line_index,
                        mid: sdp_mid,
                    })
                    .await;
            }

            SignalMessage::Error { reason } => {
                warn!("Relay rejected us: {}", reason);
                self.emit(CallEvent::RelayRejected(reason));
            }
        }
    }

    async fn handle_remote_description(&mut self, desc: SessionDescription) {
        match self.engine.set_remote_description(desc).await {
            Ok(RemoteDescriptionOutcome::Ignored) => {}
            Ok(RemoteDescriptionOutcome::Applied { answer_required }) => {
                if !answer_required {
                    info!("Remote description set (Answer)");
                    return;
                }
                match self.engine.answer().await {
                    Ok(answer) => {
                        info!("Sending ANSWER to peer");
                        self.send_description(answer);
                    }
                    Err(e) => {
                        warn!("Failed to answer: {}", e);
                        self.emit(CallEvent::NegotiationFailed(e.to_string()));
                    }
                }
            }
            Err(e) => {
                warn!("Remote description rejected: {}", e);
                self.emit(CallEvent::NegotiationFailed(e.to_string()));
            }
        }
    }
}
