//! End-to-end tests of sessions and message links against an echo peer.

use std::time::Duration;

use rstest::rstest;
use wirelink::{
    LinkError,
    MessageLink,
    SessionBuilder,
    SessionError,
    SessionState,
    TcpSession,
    codec::DEFAULT_FRAME_LENGTH,
};
use wirelink_testing::{
    EchoServer,
    LinkEvent,
    channel_handler,
    channel_message_handler,
    next_within,
};

mod support;

use support::{Msg, envelope};

async fn echo_server() -> EchoServer {
    EchoServer::spawn(DEFAULT_FRAME_LENGTH)
        .await
        .expect("bind echo server")
}

#[tokio::test]
async fn frames_are_echoed_in_order() {
    let server = echo_server().await;
    let (handler, mut frames) = channel_handler();
    let session = SessionBuilder::new()
        .remote(server.addr())
        .handler(handler)
        .connect()
        .await
        .expect("connect");

    for payload in [&b"alpha"[..], b"", b"gamma"] {
        session.send_frame(payload).await.expect("send");
    }
    for expected in [&b"alpha"[..], b"", b"gamma"] {
        let frame = next_within(&mut frames).await.expect("echoed frame");
        assert_eq!(frame.as_ref(), expected);
    }
    assert!(session.last_activity().is_some());
}

#[tokio::test]
async fn synchronous_receive_reads_echoed_bytes() {
    let server = echo_server().await;
    let session = TcpSession::new(wirelink::SessionConfig::for_remote(server.addr()));

    session.send_frame(b"sync").await.expect("send");
    let mut received = Vec::new();
    while received.len() < 5 {
        let chunk = session.receive_bytes().await.expect("receive");
        assert!(!chunk.is_empty(), "echo peer closed early");
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received, [4, b's', b'y', b'n', b'c']);
}

#[rstest]
#[case::fits_one_frame(100, 4096)]
#[case::fragmented(10_000, 256)]
#[case::many_fragments(200_000, 512)]
#[tokio::test]
async fn messages_round_trip_through_echo_peer(#[case] len: usize, #[case] max_frame: usize) {
    let server = echo_server().await;
    let session = SessionBuilder::new()
        .remote(server.addr())
        .max_frame_length(max_frame)
        .build();
    let (handler, mut events) = channel_message_handler();
    let link = MessageLink::start(session, envelope(), handler)
        .await
        .expect("start link");

    let message = Msg::blob(len);
    link.send(&message).await.expect("send");

    let event = next_within(&mut events).await.expect("echoed message");
    assert_eq!(event, LinkEvent::Message(message));
    assert_eq!(link.envelope().reassembler().buffered_len(), 0);
}

#[tokio::test]
async fn unknown_kind_is_reported_without_closing_session() {
    let server = echo_server().await;
    let session = SessionBuilder::new().remote(server.addr()).build();
    let (handler, mut events) = channel_message_handler();
    let link = MessageLink::start(session, envelope(), handler)
        .await
        .expect("start link");

    link.send(&Msg::Stray(support::Chat {
        text: "lost".into(),
    }))
    .await
    .expect("send stray");
    let event = next_within(&mut events).await.expect("decode failure");
    assert!(
        matches!(&event, LinkEvent::DecodeFailed(reason) if reason.contains("0x09")),
        "unexpected event: {event:?}"
    );

    link.send(&Msg::chat("still here")).await.expect("send chat");
    let event = next_within(&mut events).await.expect("echoed chat");
    assert_eq!(event, LinkEvent::Message(Msg::chat("still here")));
    assert!(link.session().is_open());
}

#[tokio::test]
async fn dispose_stops_sends_and_reconnects() {
    let server = echo_server().await;
    let session = SessionBuilder::new().remote(server.addr()).build();
    let (handler, _events) = channel_message_handler();
    let link = MessageLink::start(session, envelope(), handler)
        .await
        .expect("start link");

    link.session().dispose().await;
    assert_eq!(link.session().state(), SessionState::Closed);

    let err = link
        .send(&Msg::chat("too late"))
        .await
        .expect_err("disposed session");
    assert!(matches!(err, LinkError::Session(SessionError::Disposed)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.accepted(), 1);
    assert_eq!(link.session().reconnects(), 0);
}
