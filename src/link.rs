//! Message-level links over a [`TcpSession`].
//!
//! A [`MessageLink`] pairs a length-delimited session with an [`Envelope`]:
//! outbound messages are encoded, fragmented when they exceed the frame
//! capacity and written frame by frame; inbound frames are accepted by the
//! envelope and complete messages are handed to a [`MessageHandler`].

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    envelope::{Envelope, EnvelopeError, WireMessage},
    serializer::{BincodeSerializer, Serializer},
    session::{FrameHandler, Framing, SessionError, TcpSession},
};

/// Errors returned by [`MessageLink`] operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The underlying session failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The message could not be encoded.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// The session delivers raw chunks instead of frames.
    #[error("message links require a length-delimited session")]
    UnframedSession,
}

/// Consumer of inbound messages.
///
/// Like [`FrameHandler`], calls run concurrently on the tokio worker pool.
#[async_trait]
pub trait MessageHandler<M, S = BincodeSerializer>: Send + Sync + 'static
where
    M: Send + 'static,
    S: Serializer,
{
    /// Handle one complete inbound message.
    async fn handle_message(&self, link: &MessageLink<M, S>, message: M);

    /// Observe a frame that could not be decoded.
    ///
    /// The frame has been dropped; the session and its receive loop carry on.
    async fn on_decode_error(&self, link: &MessageLink<M, S>, error: &EnvelopeError) {
        let _ = (link, error);
    }

    /// Observe a session error that ended the receive loop.
    async fn on_session_error(&self, link: &MessageLink<M, S>, error: &SessionError) {
        let _ = (link, error);
    }
}

/// A session paired with the envelope used to encode and decode its
/// messages.
///
/// # Examples
///
/// ```no_run
/// use bincode::{BorrowDecode, Encode};
/// use wirelink::{
///     BincodeSerializer,
///     Envelope,
///     KindRegistry,
///     MessageKind,
///     MessageLink,
///     SessionBuilder,
///     WireMessage,
///     serializer::{Serializer, SerializerError},
/// };
///
/// #[derive(Debug, Encode, BorrowDecode)]
/// struct Ping(u32);
///
/// impl WireMessage for Ping {
///     fn kind(&self) -> MessageKind { MessageKind::new(1) }
///
///     fn encode_body<S: Serializer>(&self, serializer: &S) -> Result<Vec<u8>, SerializerError> {
///         serializer.serialize(self)
///     }
/// }
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let registry =
///     KindRegistry::<Ping, BincodeSerializer>::new().register::<Ping>(MessageKind::new(1))?;
/// let session = SessionBuilder::new()
///     .remote("127.0.0.1:7000".parse()?)
///     .build();
/// let link = MessageLink::new(session, Envelope::bincode(registry))?;
/// link.send(&Ping(1)).await?;
/// # Ok(())
/// # }
/// ```
pub struct MessageLink<M, S = BincodeSerializer> {
    session: TcpSession,
    envelope: Arc<Envelope<M, S>>,
}

impl<M, S> Clone for MessageLink<M, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            envelope: Arc::clone(&self.envelope),
        }
    }
}

impl<M, S: Serializer> fmt::Debug for MessageLink<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageLink")
            .field("session", &self.session)
            .field("max_frame_length", &self.envelope.max_frame_length())
            .finish_non_exhaustive()
    }
}

impl<M, S: Serializer> MessageLink<M, S> {
    /// Pair `session` with `envelope`.
    ///
    /// The envelope's frame capacity is lowered to the session's maximum
    /// frame length when it is larger, so every encoded frame can be sent.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::UnframedSession`] for a [`Framing::Raw`] session.
    pub fn new(session: TcpSession, envelope: Envelope<M, S>) -> Result<Self, LinkError> {
        if session.config().framing == Framing::Raw {
            return Err(LinkError::UnframedSession);
        }
        let max_frame_length = envelope.max_frame_length().min(session.max_frame_length());
        Ok(Self {
            session,
            envelope: Arc::new(envelope.with_max_frame_length(max_frame_length)),
        })
    }

    /// Return the underlying session.
    #[must_use]
    pub fn session(&self) -> &TcpSession { &self.session }

    /// Return the envelope.
    #[must_use]
    pub fn envelope(&self) -> &Envelope<M, S> { &self.envelope }
}

impl<M, S> MessageLink<M, S>
where
    M: Send + 'static,
    S: Serializer,
{
    /// Pair `session` with `envelope`, install a frame handler feeding
    /// `handler`, and start the session's receive loop.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`new`](Self::new) and of
    /// [`TcpSession::receive_async`].
    pub async fn start(
        session: TcpSession,
        envelope: Envelope<M, S>,
        handler: impl MessageHandler<M, S>,
    ) -> Result<Self, LinkError> {
        let link = Self::new(session, envelope)?;
        // The frame handler lives inside the session, so it holds the
        // envelope but not the session itself.
        link.session.set_handler(Arc::new(LinkFrameHandler {
            envelope: Arc::clone(&link.envelope),
            handler,
        }));
        link.session.receive_async().await?;
        Ok(link)
    }

    fn attach(session: &TcpSession, envelope: &Arc<Envelope<M, S>>) -> Self {
        Self {
            session: session.clone(),
            envelope: Arc::clone(envelope),
        }
    }
}

impl<M: WireMessage, S: Serializer> MessageLink<M, S> {
    /// Encode `message` and write its frames, fragmenting when it exceeds
    /// the frame capacity.
    ///
    /// Fragments of one message are written in order; sends from other tasks
    /// may interleave between them.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Envelope`] if encoding fails, before anything is
    /// written, and [`LinkError::Session`] if a write fails.
    pub async fn send(&self, message: &M) -> Result<(), LinkError> {
        let frames = self.envelope.encode_frames(message)?;
        for frame in &frames {
            self.session.send_frame(frame).await?;
        }
        Ok(())
    }
}

struct LinkFrameHandler<M, S, H> {
    envelope: Arc<Envelope<M, S>>,
    handler: H,
}

#[async_trait]
impl<M, S, H> FrameHandler for LinkFrameHandler<M, S, H>
where
    M: Send + 'static,
    S: Serializer,
    H: MessageHandler<M, S>,
{
    async fn handle_frame(&self, session: &TcpSession, frame: Bytes) {
        let link = MessageLink::attach(session, &self.envelope);
        match self.envelope.accept(frame) {
            Ok(Some(message)) => self.handler.handle_message(&link, message).await,
            Ok(None) => {}
            Err(error) => {
                warn!(session = %session.id(), %error, "dropping undecodable frame");
                self.handler.on_decode_error(&link, &error).await;
            }
        }
    }

    async fn handle_error(&self, session: &TcpSession, error: &SessionError) {
        debug!(session = %session.id(), %error, "receive loop stopped");
        let link = MessageLink::attach(session, &self.envelope);
        self.handler.on_session_error(&link, error).await;
    }
}
