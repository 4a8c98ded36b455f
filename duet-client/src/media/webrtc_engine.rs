use crate::MediaError;
use crate::media::{
    ConnectionState, MediaEngine, MediaEngineFactory, MediaEvent, MediaEventSender,
    SignalingState,
};
use async_trait::async_trait;
use duet_core::{Candidate, IceServerConfig, SdpType, SessionDescription};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use webrtc::api::{API, APIBuilder};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine as RtcMediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Settings for peer connections built by [`WebRtcEngineFactory`].
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Open a data channel with this label right away, which also gives a
    /// media-less peer something to negotiate.
    pub data_channel: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned()],
                username: None,
                credential: None,
            }],
            data_channel: Some("duet".to_owned()),
        }
    }
}

/// Builds webrtc-rs peer connections.
pub struct WebRtcEngineFactory {
    config: MediaConfig,
}

impl WebRtcEngineFactory {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = self
            .config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
            })
            .collect();

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl MediaEngineFactory for WebRtcEngineFactory {
    async fn create(&self, events: MediaEventSender) -> Result<Arc<dyn MediaEngine>, MediaError> {
        let mut m = RtcMediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let builder = PeerBuilder {
            api,
            rtc_config: self.rtc_configuration(),
            data_channel: self.config.data_channel.clone(),
            events,
            generation: Arc::new(AtomicU64::new(0)),
        };
        let pc = builder.build().await?;

        Ok(Arc::new(WebRtcEngine {
            builder,
            pc: Mutex::new(pc),
        }))
    }
}

/// Everything needed to stand up an identical peer connection again.
struct PeerBuilder {
    api: API,
    rtc_config: RTCConfiguration,
    data_channel: Option<String>,
    events: MediaEventSender,
    /// Bumped for every connection built; callbacks of older ones go quiet.
    generation: Arc<AtomicU64>,
}

impl PeerBuilder {
    async fn build(&self) -> Result<Arc<RTCPeerConnection>, MediaError> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let current = self.generation.clone();
        let live = move || current.load(Ordering::Acquire) == generation;

        let pc = Arc::new(
            self.api
                .new_peer_connection(self.rtc_config.clone())
                .await?,
        );

        let ice_tx = self.events.clone();
        let ice_live = live.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let live = ice_live.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                if !live() {
                    return;
                }
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(MediaEvent::LocalCandidate(Candidate {
                    payload: init.candidate,
                    media_line_index: init.sdp_mline_index.unwrap_or(0),
                    mid: init.sdp_mid.unwrap_or_default(),
                }));
            })
        }));

        let state_tx = self.events.clone();
        let state_live = live.clone();
        pc.on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
            let tx = state_tx.clone();
            let live = state_live.clone();
            Box::pin(async move {
                if !live() {
                    return;
                }
                info!("ICE connection state changed: {}", s);
                if let Some(state) = connection_state(s) {
                    let _ = tx.send(MediaEvent::ConnectionState(state));
                }
            })
        }));

        let negotiation_tx = self.events.clone();
        pc.on_negotiation_needed(Box::new(move || {
            let tx = negotiation_tx.clone();
            let live = live.clone();
            Box::pin(async move {
                if !live() {
                    return;
                }
                debug!("Negotiation needed");
                let _ = tx.send(MediaEvent::NegotiationNeeded);
            })
        }));

        if let Some(label) = &self.data_channel {
            pc.create_data_channel(label, None).await?;
        }

        Ok(pc)
    }
}

/// webrtc-rs backed engine.
///
/// webrtc-rs cannot roll back a local offer, so a rollback replaces the peer
/// connection with a fresh one built from the same settings. This only works
/// before the first offer/answer exchange completed; a colliding
/// renegotiation offer is refused instead.
struct WebRtcEngine {
    builder: PeerBuilder,
    pc: Mutex<Arc<RTCPeerConnection>>,
}

impl WebRtcEngine {
    fn current(&self) -> Arc<RTCPeerConnection> {
        self.pc.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn rollback(&self) -> Result<(), MediaError> {
        let pc = self.current();
        let state = pc.signaling_state();
        if state != RTCSignalingState::HaveLocalOffer {
            return Err(MediaError::Rejected(format!("nothing to roll back in {}", state)));
        }
        if pc.current_remote_description().await.is_some() {
            return Err(MediaError::Rejected(
                "cannot roll back a renegotiation offer".to_owned(),
            ));
        }

        let fresh = self.builder.build().await?;
        let stale = std::mem::replace(
            &mut *self.pc.lock().unwrap_or_else(PoisonError::into_inner),
            fresh,
        );
        if let Err(e) = stale.close().await {
            debug!("Closing rolled back peer connection failed: {}", e);
        }

        info!("Local offer rolled back, peer connection replaced");
        Ok(())
    }
}

#[async_trait]
impl MediaEngine for WebRtcEngine {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError> {
        from_rtc(self.current().create_offer(None).await?)
    }

    async fn create_answer(&self) -> Result<SessionDescription, MediaError> {
        from_rtc(self.current().create_answer(None).await?)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        if desc.kind == SdpType::Rollback {
            return self.rollback().await;
        }
        self.current().set_local_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        self.current().set_remote_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Candidate) -> Result<(), MediaError> {
        self.current()
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.payload,
                sdp_mid: Some(candidate.mid),
                sdp_mline_index: Some(candidate.media_line_index),
                username_fragment: None,
            })
            .await?;
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        match self.current().signaling_state() {
            RTCSignalingState::HaveLocalOffer | RTCSignalingState::HaveRemotePranswer => {
                SignalingState::HaveLocalOffer
            }
            RTCSignalingState::HaveRemoteOffer | RTCSignalingState::HaveLocalPranswer => {
                SignalingState::HaveRemoteOffer
            }
            RTCSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn close(&self) -> Result<(), MediaError> {
        self.current().close().await?;
        Ok(())
    }
}

/// Rollback never reaches webrtc-rs, see [`WebRtcEngine::rollback`].
fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, MediaError> {
    match desc.kind {
        SdpType::Offer => Ok(RTCSessionDescription::offer(desc.sdp)?),
        SdpType::Answer => Ok(RTCSessionDescription::answer(desc.sdp)?),
        SdpType::Rollback => Err(MediaError::UnsupportedDescription(
            RTCSdpType::Rollback.to_string(),
        )),
    }
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription, MediaError> {
    match desc.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
        other => Err(MediaError::UnsupportedDescription(other.to_string())),
    }
}

fn connection_state(s: RTCIceConnectionState) -> Option<ConnectionState> {
    match s {
        RTCIceConnectionState::New => Some(ConnectionState::New),
        RTCIceConnectionState::Checking => Some(ConnectionState::Checking),
        RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
            Some(ConnectionState::Connected)
        }
        RTCIceConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCIceConnectionState::Failed => Some(ConnectionState::Failed),
        RTCIceConnectionState::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}
