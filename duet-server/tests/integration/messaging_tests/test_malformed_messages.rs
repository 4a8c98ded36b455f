use crate::integration::{create_test_manager, init_tracing};
use crate::utils::{TestPeer, offer};

#[tokio::test]
async fn test_malformed_json_is_dropped_and_sender_survives() {
    init_tracing();

    let manager = create_test_manager();
    let mut a = TestPeer::connect(&manager, "call").await.expect("join a");
    let mut b = TestPeer::connect(&manager, "call").await.expect("join b");

    a.send_raw("{not json").await;
    b.assert_silent().await;
    a.assert_silent().await;

    // Sender is still attached and the peer still hears it.
    a.send(&offer("after-garbage")).await;
    assert_eq!(b.recv().await, offer("after-garbage"));
}

#[tokio::test]
async fn test_unknown_and_relay_only_types_are_dropped() {
    init_tracing();

    let manager = create_test_manager();
    let a = TestPeer::connect(&manager, "call").await.expect("join a");
    let mut b = TestPeer::connect(&manager, "call").await.expect("join b");

    a.send_raw(r#"{"type":"bye"}"#).await;
    a.send_raw(r#"{"type":"role","role":"polite","clientId":1}"#).await;
    a.send_raw(r#"{"type":"error","reason":"spoofed"}"#).await;
    a.send_raw(r#"{"sdp":"no type at all"}"#).await;
    a.send_raw(r#"[1, 2, 3]"#).await;

    b.assert_silent().await;
}
