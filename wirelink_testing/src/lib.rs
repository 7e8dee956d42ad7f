//! Test utilities for `wirelink` sessions and message links.
//!
//! The helpers bind loopback listeners, run a framed echo peer that can reset
//! its connections on demand, and provide handlers that forward everything
//! they receive into channels for assertions.
//!
//! ```rust,no_run
//! use wirelink::{SessionBuilder, SessionConfig};
//! use wirelink_testing::{EchoServer, channel_handler, next_within};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let server = EchoServer::spawn(SessionConfig::default().max_frame_length).await?;
//! let (handler, mut frames) = channel_handler();
//! let session = SessionBuilder::new()
//!     .remote(server.addr())
//!     .handler(handler)
//!     .connect()
//!     .await
//!     .expect("connect");
//! session.send_frame(b"ping").await.expect("send");
//! let echoed = next_within(&mut frames).await.expect("echo");
//! assert_eq!(echoed.as_ref(), b"ping");
//! # Ok(())
//! # }
//! ```

pub mod echo_server;
pub mod handlers;
pub mod logging;
pub mod net;

pub use echo_server::EchoServer;
pub use handlers::{
    ChannelHandler,
    ChannelMessageHandler,
    LinkEvent,
    RECEIVE_TIMEOUT,
    channel_handler,
    channel_message_handler,
    next_within,
};
pub use logging::{LoggerHandle, logger};
pub use net::{local_listener, reset_stream, unused_listener};
