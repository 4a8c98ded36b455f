use std::sync::Arc;

use duet_client::signaling::{connect, session_url};
use duet_client::{Call, CallEvent, CallHandle, MediaEngine, SignalingState};
use duet_core::{Role, SessionId};
use duet_server::RelayHandle;

use crate::integration::init_tracing;
use crate::utils::{MockMediaEngine, MockMediaFactory, next_call_event, start_relay, wait_until};

async fn join(
    relay: &RelayHandle,
    session: &SessionId,
    label: &str,
) -> (CallHandle, Arc<MockMediaEngine>) {
    let media = MockMediaEngine::new(label);
    let url = session_url(&relay.url(), session);
    let signals = connect(&url).await.expect("relay reachable");
    let call = Call::start(&MockMediaFactory::new(media.clone()), signals)
        .await
        .expect("call started");
    (call, media)
}

async fn expect_role(call: &mut CallHandle, expected: Role) {
    match next_call_event(call).await.expect("role event") {
        CallEvent::RoleAssigned { role, .. } => assert_eq!(role, expected),
        other => panic!("expected role assignment, got {:?}", other),
    }
}

#[tokio::test]
async fn test_two_calls_negotiate_through_relay() {
    init_tracing();

    let relay = start_relay().await.expect("relay");
    let session = SessionId::parse("relay-call").expect("valid id");

    let (mut a, media_a) = join(&relay, &session, "a").await;
    expect_role(&mut a, Role::Polite).await;
    let (mut b, media_b) = join(&relay, &session, "b").await;
    expect_role(&mut b, Role::Impolite).await;

    a.negotiate().await.expect("a negotiates");
    b.negotiate().await.expect("b negotiates");

    wait_until("peers to converge over the relay", || {
        media_a.signaling_state() == SignalingState::Stable
            && media_b.signaling_state() == SignalingState::Stable
            && media_a.remote_description().is_some()
            && media_a.remote_description() == media_b.local_description()
            && media_b.remote_description() == media_a.local_description()
    })
    .await
    .expect("converged");

    a.hang_up().await;
    expect_role(&mut b, Role::Polite).await;
    b.hang_up().await;
}

#[tokio::test]
async fn test_third_call_is_turned_away() {
    init_tracing();

    let relay = start_relay().await.expect("relay");
    let session = SessionId::parse("crowded").expect("valid id");

    let (mut a, _) = join(&relay, &session, "a").await;
    expect_role(&mut a, Role::Polite).await;
    let (mut b, _) = join(&relay, &session, "b").await;
    expect_role(&mut b, Role::Impolite).await;

    let (mut c, media_c) = join(&relay, &session, "c").await;
    assert!(matches!(
        next_call_event(&mut c).await.expect("rejection"),
        CallEvent::RelayRejected(reason) if reason.contains("full")
    ));
    assert_eq!(next_call_event(&mut c).await.expect("end"), CallEvent::Ended);
    assert_eq!(media_c.signaling_state(), SignalingState::Closed);

    a.hang_up().await;
    b.hang_up().await;
}
