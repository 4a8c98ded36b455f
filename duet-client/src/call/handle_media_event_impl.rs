use duet_core::SignalMessage;
use tracing::info;

use crate::call::{Call, CallEvent};
use crate::media::MediaEvent;

impl Call {
    pub(super) async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::LocalCandidate(candidate) => {
                self.send(SignalMessage::from(candidate));
            }

            MediaEvent::NegotiationNeeded => {
                info!("Media engine needs negotiation, sending OFFER");
                self.negotiate().await;
            }

            MediaEvent::ConnectionState(state) => {
                info!("Connection state: {:?}", state);
                self.emit(CallEvent::ConnectionStateChanged(state));
            }
        }
    }
}
