//! Channel-backed handlers.
//!
//! Each handler forwards what the receive loop delivers into an unbounded
//! channel so tests can await it with [`next_within`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{sync::mpsc, time::timeout};
use wirelink::{
    BincodeSerializer,
    EnvelopeError,
    FrameHandler,
    MessageHandler,
    MessageLink,
    SessionError,
    TcpSession,
};

/// How long [`next_within`] waits before giving up.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Receive the next item, or `None` if nothing arrives within
/// [`RECEIVE_TIMEOUT`] or the channel closed.
pub async fn next_within<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
    timeout(RECEIVE_TIMEOUT, rx.recv()).await.ok().flatten()
}

/// [`FrameHandler`] forwarding every frame into a channel.
#[derive(Clone)]
pub struct ChannelHandler {
    frames: mpsc::UnboundedSender<Bytes>,
    errors: Option<mpsc::UnboundedSender<String>>,
}

impl ChannelHandler {
    /// Also forward receive-loop errors, rendered as strings.
    #[must_use]
    pub fn with_errors(mut self) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.errors = Some(tx);
        (self, rx)
    }
}

/// Create a [`ChannelHandler`] and the receiver for its frames.
#[must_use]
pub fn channel_handler() -> (ChannelHandler, mpsc::UnboundedReceiver<Bytes>) {
    let (frames, rx) = mpsc::unbounded_channel();
    (
        ChannelHandler {
            frames,
            errors: None,
        },
        rx,
    )
}

#[async_trait]
impl FrameHandler for ChannelHandler {
    async fn handle_frame(&self, _session: &TcpSession, frame: Bytes) {
        let _ = self.frames.send(frame);
    }

    async fn handle_error(&self, _session: &TcpSession, error: &SessionError) {
        if let Some(errors) = &self.errors {
            let _ = errors.send(error.to_string());
        }
    }
}

/// Something a [`ChannelMessageHandler`] observed.
#[derive(Debug, PartialEq)]
pub enum LinkEvent<M> {
    /// A complete message arrived.
    Message(M),
    /// A frame was dropped because it could not be decoded.
    DecodeFailed(String),
    /// The receive loop stopped with an error.
    SessionFailed(String),
}

impl<M> LinkEvent<M> {
    /// Return the message, if this event carries one.
    pub fn into_message(self) -> Option<M> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }
}

/// [`MessageHandler`] forwarding every event into a channel.
pub struct ChannelMessageHandler<M> {
    events: mpsc::UnboundedSender<LinkEvent<M>>,
}

/// Create a [`ChannelMessageHandler`] and the receiver for its events.
#[must_use]
pub fn channel_message_handler<M>() -> (ChannelMessageHandler<M>, mpsc::UnboundedReceiver<LinkEvent<M>>) {
    let (events, rx) = mpsc::unbounded_channel();
    (ChannelMessageHandler { events }, rx)
}

#[async_trait]
impl<M: Send + 'static> MessageHandler<M, BincodeSerializer> for ChannelMessageHandler<M> {
    async fn handle_message(&self, _link: &MessageLink<M>, message: M) {
        let _ = self.events.send(LinkEvent::Message(message));
    }

    async fn on_decode_error(&self, _link: &MessageLink<M>, error: &EnvelopeError) {
        let _ = self.events.send(LinkEvent::DecodeFailed(error.to_string()));
    }

    async fn on_session_error(&self, _link: &MessageLink<M>, error: &SessionError) {
        let _ = self.events.send(LinkEvent::SessionFailed(error.to_string()));
    }
}
