//! Integration coverage for the `wirelink_testing` helpers.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::{io::AsyncReadExt, net::TcpStream};
use tokio_util::codec::Framed;
use wirelink::{VarintFrameCodec, codec::DEFAULT_FRAME_LENGTH};
use wirelink_testing::{EchoServer, local_listener, reset_stream, unused_listener};

async fn framed_client(server: &EchoServer) -> Framed<TcpStream, VarintFrameCodec> {
    let stream = TcpStream::connect(server.addr()).await.expect("connect");
    Framed::new(stream, VarintFrameCodec::new(DEFAULT_FRAME_LENGTH))
}

#[tokio::test]
async fn echo_server_returns_frames() {
    let server = EchoServer::spawn(DEFAULT_FRAME_LENGTH).await.expect("spawn");
    let mut framed = framed_client(&server).await;

    framed.send(Bytes::from_static(b"echo")).await.expect("send");
    let frame = framed.next().await.expect("frame").expect("valid frame");
    assert_eq!(frame.as_ref(), b"echo");
    assert_eq!(server.accepted(), 1);
}

#[tokio::test]
async fn reset_connections_aborts_peers() {
    let server = EchoServer::spawn(DEFAULT_FRAME_LENGTH).await.expect("spawn");
    let mut framed = framed_client(&server).await;
    framed.send(Bytes::from_static(b"x")).await.expect("send");
    framed.next().await.expect("frame").expect("valid frame");

    server.reset_connections();
    assert!(matches!(framed.next().await, None | Some(Err(_))));
}

#[tokio::test]
async fn reset_stream_is_seen_as_connection_reset() {
    let (listener, addr) = local_listener().await.expect("bind");
    let mut client = TcpStream::connect(addr).await.expect("connect");
    let (accepted, _) = listener.accept().await.expect("accept");
    reset_stream(accepted).expect("reset");

    let mut buf = [0_u8; 1];
    let err = client.read(&mut buf).await.expect_err("reset");
    assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
}

#[test]
fn unused_listener_binds_loopback() {
    let listener = unused_listener().expect("bind");
    let addr = listener.local_addr().expect("address");
    assert!(addr.ip().is_loopback());
    assert_ne!(addr.port(), 0);
}
