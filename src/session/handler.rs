//! Callbacks invoked by the asynchronous receive loop.

use std::{any::Any, future::Future};

use async_trait::async_trait;
use bytes::Bytes;

use super::{SessionError, TcpSession};

/// Consumer of inbound frames.
///
/// The receive loop spawns one task per frame (or per raw chunk), so
/// implementations must tolerate concurrent calls. Frames are dispatched in
/// wire order but may complete in any order.
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    /// Handle one inbound frame.
    async fn handle_frame(&self, session: &TcpSession, frame: Bytes);

    /// Observe an error that ended the receive loop.
    ///
    /// The session has already been closed, and reconnected when
    /// auto-reconnect is enabled, by the time this runs.
    async fn handle_error(&self, session: &TcpSession, error: &SessionError) {
        let _ = (session, error);
    }
}

/// [`FrameHandler`] backed by an async closure.
///
/// # Examples
///
/// ```
/// use wirelink::session::{FnHandler, SessionBuilder};
///
/// let session = SessionBuilder::new()
///     .handler(FnHandler::new(|_session, frame: bytes::Bytes| async move {
///         println!("received {} bytes", frame.len());
///     }))
///     .build();
/// assert!(session.has_handler());
/// ```
pub struct FnHandler<F>(F);

impl<F> FnHandler<F> {
    /// Wrap `f` as a frame handler.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(TcpSession, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> FrameHandler for FnHandler<F>
where
    F: Fn(TcpSession, Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle_frame(&self, session: &TcpSession, frame: Bytes) {
        (self.0)(session.clone(), frame).await;
    }
}

/// Render a panic payload for logging.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else {
        format!("{panic:?}")
    }
}
