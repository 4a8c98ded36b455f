mod ws_client;

pub use ws_client::{connect, session_url};

use duet_core::SignalMessage;
use tokio::sync::mpsc;

/// Duplex, message-oriented link to the relay.
///
/// Dropping `outbound` ends the writer side; `inbound` yields `None` once the
/// relay is gone.
pub struct SignalChannel {
    pub outbound: mpsc::UnboundedSender<SignalMessage>,
    pub inbound: mpsc::UnboundedReceiver<SignalMessage>,
}

impl SignalChannel {
    pub fn new(
        outbound: mpsc::UnboundedSender<SignalMessage>,
        inbound: mpsc::UnboundedReceiver<SignalMessage>,
    ) -> Self {
        Self { outbound, inbound }
    }
}
