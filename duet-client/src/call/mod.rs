//! Per-call driver: one task that owns the [`NegotiationEngine`] and feeds it
//! relay messages, media events and caller commands strictly one at a time.

mod handle_media_event_impl;
mod handle_signal_impl;

use crate::media::{
    ConnectionState, MediaConfig, MediaEngineFactory, MediaEvent, SignalingState,
    WebRtcEngineFactory,
};
use crate::negotiation::NegotiationEngine;
use crate::signaling::{self, SignalChannel};
use crate::{CallError, NegotiationError, TransportError};
use duet_core::{ClientId, Role, SessionDescription, SessionId, SignalMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Base relay address, e.g. `ws://127.0.0.1:8080`.
    pub relay_url: String,
    pub session: SessionId,
    pub media: MediaConfig,
}

impl Default for CallConfig {
    /// Local relay, fresh random session.
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:8080".to_owned(),
            session: SessionId::random(),
            media: MediaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallCommand {
    /// Start an offer unless one is already outstanding.
    Negotiate,
    Hangup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    RoleAssigned { role: Role, client_id: ClientId },
    ConnectionStateChanged(ConnectionState),
    NegotiationFailed(String),
    RelayRejected(String),
    Ended,
}

/// Caller side of a running [`Call`].
pub struct CallHandle {
    commands: mpsc::Sender<CallCommand>,
    events: mpsc::UnboundedReceiver<CallEvent>,
    task: JoinHandle<()>,
}

impl CallHandle {
    pub async fn negotiate(&self) -> Result<(), TransportError> {
        self.commands
            .send(CallCommand::Negotiate)
            .await
            .map_err(|_| TransportError::CallClosed)
    }

    pub async fn next_event(&mut self) -> Option<CallEvent> {
        self.events.recv().await
    }

    /// Ask the call to close its media session and wait for the task to end.
    pub async fn hang_up(self) {
        let _ = self.commands.send(CallCommand::Hangup).await;
        if let Err(e) = self.task.await {
            error!("Call task failed: {}", e);
        }
    }
}

pub struct Call {
    engine: NegotiationEngine,
    signals: SignalChannel,
    media_rx: mpsc::UnboundedReceiver<MediaEvent>,
    media_open: bool,
    command_rx: mpsc::Receiver<CallCommand>,
    event_tx: mpsc::UnboundedSender<CallEvent>,
}

impl Call {
    /// Connect to the relay and start a call backed by webrtc-rs.
    pub async fn dial(config: CallConfig) -> Result<CallHandle, CallError> {
        let url = signaling::session_url(&config.relay_url, &config.session);
        let signals = signaling::connect(&url).await?;
        let factory = WebRtcEngineFactory::new(config.media);
        Ok(Self::start(&factory, signals).await?)
    }

    /// Open a media session through `factory` and spawn the call task.
    pub async fn start(
        factory: &dyn MediaEngineFactory,
        signals: SignalChannel,
    ) -> Result<CallHandle, NegotiationError> {
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let engine = NegotiationEngine::open(factory, media_tx).await?;

        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let call = Call {
            engine,
            signals,
            media_rx,
            media_open: true,
            command_rx,
            event_tx,
        };
        let task = tokio::spawn(call.run());

        Ok(CallHandle {
            commands: command_tx,
            events: event_rx,
            task,
        })
    }

    async fn run(mut self) {
        info!("Call event loop started");

        loop {
            tokio::select! {
                msg = self.signals.inbound.recv() => {
                    match msg {
                        Some(m) => self.handle_signal(m).await,
                        None => {
                            info!("Signaling channel closed. Ending call.");
                            break;
                        }
                    }
                }

                evt = self.media_rx.recv(), if self.media_open => {
                    match evt {
                        Some(e) => self.handle_media_event(e).await,
                        None => {
                            warn!("Media engine stopped reporting events");
                            self.media_open = false;
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(CallCommand::Negotiate) => self.negotiate().await,
                        Some(CallCommand::Hangup) | None => {
                            info!("Hanging up");
                            break;
                        }
                    }
                }
            }
        }

        self.engine.close().await;
        self.emit(CallEvent::Ended);
        info!("Call event loop finished");
    }

    async fn negotiate(&mut self) {
        if let Ok(SignalingState::HaveLocalOffer) = self.engine.signaling_state() {
            debug!("Offer already outstanding, not offering again");
            return;
        }
        match self.engine.offer().await {
            Ok(offer) => self.send_description(offer),
            Err(e) => self.emit(CallEvent::NegotiationFailed(e.to_string())),
        }
    }

    fn send_description(&self, desc: SessionDescription) {
        match SignalMessage::try_from(desc) {
            Ok(msg) => self.send(msg),
            Err(e) => error!("Refusing to send description: {}", e),
        }
    }

    fn send(&self, msg: SignalMessage) {
        if self.signals.outbound.send(msg).is_err() {
            warn!("Signaling channel closed, dropping outbound message");
        }
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.event_tx.send(event);
    }
}
