use std::sync::Arc;

use duet_client::{
    MediaConfig, MediaEngine, MediaEngineFactory, MediaError, MediaEvent, NegotiationEngine,
    RemoteDescriptionOutcome, SignalingState, WebRtcEngineFactory,
};
use duet_core::{Role, SdpType, SessionDescription};
use tokio::sync::mpsc;

use crate::integration::init_tracing;

struct RealPeer {
    engine: NegotiationEngine,
    media: Arc<dyn MediaEngine>,
    _events: mpsc::UnboundedReceiver<MediaEvent>,
}

/// webrtc-rs peer with a data channel and no ICE servers.
async fn real_peer(role: Role) -> RealPeer {
    let factory = WebRtcEngineFactory::new(MediaConfig {
        ice_servers: Vec::new(),
        data_channel: Some("duet".to_owned()),
    });
    let (tx, events) = mpsc::unbounded_channel();
    let media = factory.create(tx).await.expect("peer connection");
    let engine = NegotiationEngine::new(media.clone());
    engine.set_role(role);
    RealPeer {
        engine,
        media,
        _events: events,
    }
}

async fn close(peers: [RealPeer; 2]) {
    for peer in peers {
        peer.engine.close().await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_webrtc_offer_answer() {
    init_tracing();

    let a = real_peer(Role::Polite).await;
    let b = real_peer(Role::Impolite).await;

    let offer = a.engine.offer().await.expect("a offers");
    assert_eq!(offer.kind, SdpType::Offer);
    assert!(offer.sdp.contains("m=application"));
    assert_eq!(a.media.signaling_state(), SignalingState::HaveLocalOffer);

    let outcome = b.engine.set_remote_description(offer).await.expect("b applies");
    assert_eq!(
        outcome,
        RemoteDescriptionOutcome::Applied {
            answer_required: true
        }
    );
    assert_eq!(b.media.signaling_state(), SignalingState::HaveRemoteOffer);

    let answer = b.engine.answer().await.expect("b answers");
    assert_eq!(answer.kind, SdpType::Answer);
    assert_eq!(b.media.signaling_state(), SignalingState::Stable);

    let outcome = a.engine.set_remote_description(answer).await.expect("a applies");
    assert_eq!(
        outcome,
        RemoteDescriptionOutcome::Applied {
            answer_required: false
        }
    );
    assert_eq!(a.media.signaling_state(), SignalingState::Stable);

    close([a, b]).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_webrtc_glare_converges() {
    init_tracing();

    let a = real_peer(Role::Polite).await;
    let b = real_peer(Role::Impolite).await;

    let offer_a = a.engine.offer().await.expect("a offers");
    let offer_b = b.engine.offer().await.expect("b offers");

    assert_eq!(
        b.engine.set_remote_description(offer_a).await.expect("b handles"),
        RemoteDescriptionOutcome::Ignored
    );
    assert_eq!(
        a.engine.set_remote_description(offer_b).await.expect("a rolls back"),
        RemoteDescriptionOutcome::Applied {
            answer_required: true
        }
    );
    assert_eq!(a.media.signaling_state(), SignalingState::HaveRemoteOffer);

    let answer = a.engine.answer().await.expect("a answers");
    b.engine
        .set_remote_description(answer)
        .await
        .expect("b applies answer");

    assert_eq!(a.media.signaling_state(), SignalingState::Stable);
    assert_eq!(b.media.signaling_state(), SignalingState::Stable);

    close([a, b]).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_webrtc_rollback_needs_pending_offer() {
    init_tracing();

    let a = real_peer(Role::Polite).await;

    let result = a
        .media
        .set_local_description(SessionDescription::rollback())
        .await;
    assert!(matches!(result, Err(MediaError::Rejected(_))));
    assert_eq!(a.media.signaling_state(), SignalingState::Stable);

    let result = a
        .media
        .set_remote_description(SessionDescription::rollback())
        .await;
    assert!(matches!(result, Err(MediaError::UnsupportedDescription(_))));

    a.engine.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_webrtc_renegotiation_offer_is_not_rolled_back() {
    init_tracing();

    let a = real_peer(Role::Polite).await;
    let b = real_peer(Role::Impolite).await;

    let offer = a.engine.offer().await.expect("a offers");
    b.engine.set_remote_description(offer).await.expect("b applies");
    let answer = b.engine.answer().await.expect("b answers");
    a.engine.set_remote_description(answer).await.expect("a applies");

    a.engine.offer().await.expect("a renegotiates");
    assert_eq!(a.media.signaling_state(), SignalingState::HaveLocalOffer);

    let result = a
        .media
        .set_local_description(SessionDescription::rollback())
        .await;
    assert!(matches!(result, Err(MediaError::Rejected(_))));
    assert_eq!(a.media.signaling_state(), SignalingState::HaveLocalOffer);

    close([a, b]).await;
}
