//! Server-side sessions produced by `SessionListener`.

use std::net::Ipv4Addr;

use async_trait::async_trait;
use rstest::rstest;
use tokio_util::sync::CancellationToken;
use wirelink::{
    MessageHandler,
    MessageLink,
    SessionBuilder,
    SessionConfig,
    SessionListener,
};
use wirelink_testing::{
    LinkEvent,
    LoggerHandle,
    channel_handler,
    channel_message_handler,
    logger,
    next_within,
};

mod support;

use support::{Chat, Msg, envelope};

/// Answers every chat with a prefixed copy.
struct Responder;

#[async_trait]
impl MessageHandler<Msg> for Responder {
    async fn handle_message(&self, link: &MessageLink<Msg>, message: Msg) {
        if let Msg::Chat(Chat { text }) = message {
            let _ = link.send(&Msg::chat(&format!("re: {text}"))).await;
        }
    }
}

async fn bind(config: SessionConfig) -> SessionListener {
    SessionListener::bind((Ipv4Addr::LOCALHOST, 0), config)
        .await
        .expect("bind listener")
}

#[tokio::test]
async fn accepted_sessions_carry_message_links() {
    let listener = bind(SessionConfig::default()).await;
    let addr = listener.local_addr().expect("address");

    let (handler, mut events) = channel_message_handler();
    let client = SessionBuilder::new().remote(addr).build();
    let (accepted, client) = tokio::join!(
        listener.accept(),
        MessageLink::start(client, envelope(), handler)
    );
    let accepted = accepted.expect("accept");
    let client = client.expect("client link");
    assert!(accepted.is_accepted());
    let _server = MessageLink::start(accepted, envelope(), Responder)
        .await
        .expect("server link");

    client.send(&Msg::chat("hello")).await.expect("send");
    let event = next_within(&mut events).await.expect("reply");
    assert_eq!(event, LinkEvent::Message(Msg::chat("re: hello")));
}

#[tokio::test]
async fn large_replies_are_fragmented_by_the_server() {
    let listener = bind(SessionConfig {
        max_frame_length: 128,
        ..SessionConfig::default()
    })
    .await;
    let addr = listener.local_addr().expect("address");

    let (handler, mut events) = channel_message_handler();
    let client = SessionBuilder::new()
        .remote(addr)
        .max_frame_length(128)
        .build();
    let (accepted, client) = tokio::join!(
        listener.accept(),
        MessageLink::start(client, envelope(), handler)
    );
    let server = MessageLink::start(accepted.expect("accept"), envelope(), Responder)
        .await
        .expect("server link");
    let client = client.expect("client link");
    assert_eq!(server.envelope().max_frame_length(), 128);

    let text = "x".repeat(2000);
    client.send(&Msg::chat(&text)).await.expect("send");
    let event = next_within(&mut events).await.expect("reply");
    assert_eq!(event, LinkEvent::Message(Msg::chat(&format!("re: {text}"))));
}

#[rstest]
#[tokio::test]
async fn undecodable_frames_are_logged(mut logger: LoggerHandle) {
    let listener = bind(SessionConfig::default()).await;
    let addr = listener.local_addr().expect("address");

    let client = SessionBuilder::new().remote(addr).build();
    let (accepted, opened) = tokio::join!(listener.accept(), client.open());
    opened.expect("open");
    let (handler, mut events) = channel_message_handler::<Msg>();
    let _server = MessageLink::start(accepted.expect("accept"), envelope(), handler)
        .await
        .expect("server link");

    client.send_frame(&[0x42, 1, 2, 3]).await.expect("send");
    let event = next_within(&mut events).await.expect("decode failure");
    assert!(matches!(event, LinkEvent::DecodeFailed(_)));
    assert!(logger.contains("dropping undecodable frame"));
}

#[tokio::test]
async fn serve_runs_until_cancelled() {
    let (handler, mut frames) = channel_handler();
    let listener = bind(SessionConfig::default()).await.with_handler(handler);
    let addr = listener.local_addr().expect("address");
    let shutdown = CancellationToken::new();

    let client = SessionBuilder::new().remote(addr).build();
    let run = async {
        client.send_frame(b"served").await.expect("send");
        let frame = next_within(&mut frames).await.expect("frame");
        assert_eq!(frame.as_ref(), b"served");
        assert_eq!(listener.sessions().active_sessions().len(), 1);
        shutdown.cancel();
    };
    let (served, ()) = tokio::join!(listener.serve(shutdown.clone()), run);
    served.expect("serve");
}
