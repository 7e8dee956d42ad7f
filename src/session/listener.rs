//! Listener producing sessions for accepted connections.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use log::warn;
use tokio::{
    net::{TcpListener, ToSocketAddrs},
    select,
    time::sleep,
};
use tokio_util::sync::CancellationToken;

use super::{FrameHandler, SessionConfig, SessionError, SessionRegistry, TcpSession};

/// Configuration for exponential back-off timing in the accept loop.
///
/// The back-off starts at `initial_delay` and doubles on each failed
/// `accept()`, capped at `max_delay`.
///
/// # Default Values
/// - `initial_delay`: 10 milliseconds
/// - `max_delay`: 1 second
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay used for the first retry after an `accept()` failure.
    pub initial_delay: Duration,
    /// Maximum back-off delay once retries have increased exponentially.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl BackoffConfig {
    /// Clamp delays to at least one millisecond and ensure
    /// `initial_delay <= max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use wirelink::session::BackoffConfig;
    ///
    /// let cfg = BackoffConfig {
    ///     initial_delay: Duration::from_millis(5),
    ///     max_delay: Duration::from_millis(1),
    /// };
    ///
    /// let normalized = cfg.normalized();
    /// assert_eq!(normalized.initial_delay, Duration::from_millis(1));
    /// assert_eq!(normalized.max_delay, Duration::from_millis(5));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.initial_delay = self.initial_delay.max(Duration::from_millis(1));
        self.max_delay = self.max_delay.max(Duration::from_millis(1));
        if self.initial_delay > self.max_delay {
            std::mem::swap(&mut self.initial_delay, &mut self.max_delay);
        }
        self
    }
}

/// Accepts TCP connections and wraps each one in a [`TcpSession`].
///
/// Accepted sessions share the listener's configuration and handler, start
/// their receive loop immediately when a handler is installed, and are
/// tracked in a [`SessionRegistry`].
pub struct SessionListener {
    listener: TcpListener,
    config: SessionConfig,
    handler: Option<Arc<dyn FrameHandler>>,
    backoff: BackoffConfig,
    registry: SessionRegistry,
}

impl SessionListener {
    /// Bind a listener to `addr`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if binding fails.
    pub async fn bind(addr: impl ToSocketAddrs, config: SessionConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, config))
    }

    /// Wrap an already bound listener.
    #[must_use]
    pub fn from_listener(listener: TcpListener, config: SessionConfig) -> Self {
        Self {
            listener,
            config: config.normalized(),
            handler: None,
            backoff: BackoffConfig::default(),
            registry: SessionRegistry::new(),
        }
    }

    /// Install the handler given to every accepted session.
    #[must_use]
    pub fn with_handler(mut self, handler: impl FrameHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Configure the accept-failure back-off.
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff.normalized();
        self
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the socket cannot report its address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.listener.local_addr() }

    /// Sessions accepted by this listener.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry { &self.registry }

    /// Accept one connection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if accepting fails or the socket options
    /// cannot be applied.
    pub async fn accept(&self) -> Result<TcpSession, SessionError> {
        let (stream, peer) = self.listener.accept().await?;
        let session = TcpSession::accepted(stream, self.config.clone()).await?;
        self.registry.insert(&session);
        if let Some(handler) = &self.handler {
            session.set_handler(Arc::clone(handler));
            session.receive_async().await?;
        }
        log::debug!("accepted session: id={}, peer={peer}", session.id());
        Ok(session)
    }

    /// Accept connections until `shutdown` is cancelled, then dispose every
    /// live session.
    ///
    /// Each accepted session is kept alive by its receive loop, so a handler
    /// must be installed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoHandler`] when no handler is installed.
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<(), SessionError> {
        if self.handler.is_none() {
            return Err(SessionError::NoHandler);
        }
        let mut delay = self.backoff.initial_delay;
        while let Some(next_delay) = self.accept_iteration(&shutdown, delay).await {
            delay = next_delay;
        }
        for session in self.registry.active_sessions() {
            session.dispose().await;
        }
        self.registry.prune();
        Ok(())
    }

    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    async fn accept_iteration(
        &self,
        shutdown: &CancellationToken,
        delay: Duration,
    ) -> Option<Duration> {
        select! {
            biased;

            () = shutdown.cancelled() => None,
            res = self.accept() => Some(match res {
                Ok(_) => {
                    self.registry.prune();
                    self.backoff.initial_delay
                }
                Err(e) => {
                    let local_addr = self.local_addr().ok();
                    warn!("accept error: error={e:?}, local_addr={local_addr:?}");
                    sleep(delay).await;
                    (delay * 2).min(self.backoff.max_delay)
                }
            }),
        }
    }
}
