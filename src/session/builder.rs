//! Fluent construction of [`TcpSession`] values.

use std::{net::SocketAddr, sync::Arc};

use super::{FrameHandler, Framing, SessionConfig, SessionError, SocketOptions, TcpSession};

/// Builder for [`TcpSession`].
///
/// # Examples
///
/// ```
/// use wirelink::{Framing, SessionBuilder, SessionState};
///
/// let session = SessionBuilder::new()
///     .remote("127.0.0.1:7000".parse().expect("valid address"))
///     .auto_reconnect(false)
///     .framing(Framing::Raw)
///     .max_frame_length(4096)
///     .build();
/// assert_eq!(session.state(), SessionState::Closed);
/// assert_eq!(session.max_frame_length(), 4096);
/// ```
#[derive(Default)]
#[must_use]
pub struct SessionBuilder {
    config: SessionConfig,
    handler: Option<Arc<dyn FrameHandler>>,
}

impl SessionBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self { Self::default() }

    /// Start from an existing configuration.
    pub fn from_config(config: SessionConfig) -> Self {
        Self {
            config,
            handler: None,
        }
    }

    /// Set the remote endpoint.
    pub fn remote(mut self, addr: SocketAddr) -> Self {
        self.config.remote = Some(addr);
        self
    }

    /// Set the local endpoint to bind before connecting.
    pub fn local(mut self, addr: SocketAddr) -> Self {
        self.config.local = Some(addr);
        self
    }

    /// Enable or disable reconnecting after I/O failures.
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// Choose whether an empty read closes the session.
    pub fn disconnect_on_empty(mut self, enabled: bool) -> Self {
        self.config.disconnect_on_empty = enabled;
        self
    }

    /// Choose how the receive loop delivers bytes.
    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    /// Set the largest frame sent or accepted.
    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.config.max_frame_length = length;
        self
    }

    /// Override the per-read receive capacity.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = Some(size);
        self
    }

    /// Set the socket options applied before connecting.
    pub fn socket_options(mut self, options: SocketOptions) -> Self {
        self.config.socket = options;
        self
    }

    /// Install the handler fed by the asynchronous receive loop.
    pub fn handler(mut self, handler: impl FrameHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Install a shared handler fed by the asynchronous receive loop.
    pub fn shared_handler(mut self, handler: Arc<dyn FrameHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Build a closed session.
    pub fn build(self) -> TcpSession {
        let session = TcpSession::new(self.config);
        if let Some(handler) = self.handler {
            session.set_handler(handler);
        }
        session
    }

    /// Build the session, open it and, when a handler is installed, start
    /// the asynchronous receive loop.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TcpSession::open`].
    pub async fn connect(self) -> Result<TcpSession, SessionError> {
        let session = self.build();
        session.open().await?;
        if session.has_handler() {
            session.receive_async().await?;
        }
        Ok(session)
    }
}
