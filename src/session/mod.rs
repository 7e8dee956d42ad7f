//! Managed, reconnecting TCP sessions.
//!
//! A [`TcpSession`] owns one TCP connection at a time and hides its
//! lifecycle from callers: sends open the connection on demand, I/O failures
//! close it and, when auto-reconnect is enabled, dial again before the
//! original error is returned. An optional asynchronous receive loop reads
//! the stream, recovers frame boundaries and dispatches each frame to a
//! [`FrameHandler`] on the tokio worker pool.
//!
//! Sessions are cheap handles over shared state; clones refer to the same
//! connection.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Instant,
};

use bytes::Bytes;
use futures::FutureExt;
use socket2::SockRef;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpSocket,
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
    sync::{Mutex as AsyncMutex, watch},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

pub mod builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod registry;
pub mod state;

pub use builder::SessionBuilder;
pub use config::{Framing, SessionConfig, SocketOptions};
pub use error::SessionError;
pub use handler::{FnHandler, FrameHandler};
pub use listener::{BackoffConfig, SessionListener};
pub use registry::SessionRegistry;
pub use state::{SessionId, SessionState};

use crate::{
    codec::{FrameRecovery, FramingError, encode_frame},
    metrics::{self, Direction},
};

/// Receive capacity used when the socket cannot report its buffer size.
const FALLBACK_RECV_CAPACITY: usize = 8 * 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Why the receive loop stopped reading.
enum ReadStop {
    /// The session closed or the loop was cancelled.
    Stopped,
    /// The peer sent no more bytes.
    Empty,
    /// The read failed.
    Failed(std::io::Error),
    /// The stream violated the framing.
    Framing(FramingError),
}

pub(crate) struct SessionInner {
    id: SessionId,
    config: SessionConfig,
    accepted: bool,
    lifecycle: AsyncMutex<()>,
    state: watch::Sender<SessionState>,
    reader: AsyncMutex<Option<OwnedReadHalf>>,
    writer: AsyncMutex<Option<OwnedWriteHalf>>,
    local_addr: Mutex<Option<SocketAddr>>,
    remote_addr: Mutex<Option<SocketAddr>>,
    last_activity: Mutex<Option<Instant>>,
    generation: AtomicU64,
    read_outstanding: AtomicBool,
    receive_armed: AtomicBool,
    cancel: Mutex<CancellationToken>,
    recovery: Mutex<FrameRecovery>,
    recv_capacity: AtomicUsize,
    disposed: AtomicBool,
    reconnects: AtomicU64,
    handler: Mutex<Option<Arc<dyn FrameHandler>>>,
    tracker: TaskTracker,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        lock(&self.cancel).cancel();
        if self.state.borrow().is_open() {
            metrics::dec_sessions();
        }
    }
}

/// Handle to a managed TCP session.
///
/// # Examples
///
/// ```no_run
/// use wirelink::{SessionBuilder, TcpSession};
///
/// # async fn demo() -> Result<(), wirelink::SessionError> {
/// let session: TcpSession = SessionBuilder::new()
///     .remote("127.0.0.1:7000".parse().expect("valid address"))
///     .connect()
///     .await?;
/// session.send_frame(b"hello").await?;
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TcpSession {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for TcpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpSession")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .field("remote_addr", &self.remote_addr())
            .finish_non_exhaustive()
    }
}

impl TcpSession {
    /// Create a closed session. Nothing touches the network until the
    /// session is opened or used.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self { Self::from_parts(config.normalized(), false, None) }

    /// Wrap a stream accepted by a listener.
    ///
    /// The session starts open. It never reconnects and cannot be reopened
    /// once closed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the socket options cannot be applied.
    pub async fn accepted(stream: TcpStream, config: SessionConfig) -> Result<Self, SessionError> {
        let config = config.normalized();
        config.socket.apply_to_stream(&stream)?;
        let remote = stream.peer_addr().ok();
        let session = Self::from_parts(config, true, remote);
        session.install(stream).await;
        Ok(session)
    }

    fn from_parts(config: SessionConfig, accepted: bool, remote_addr: Option<SocketAddr>) -> Self {
        let (state, _) = watch::channel(SessionState::Closed);
        let recv_capacity = config.recv_buffer_size.unwrap_or(FALLBACK_RECV_CAPACITY);
        let max_frame_length = config.max_frame_length;
        Self {
            inner: Arc::new(SessionInner {
                id: SessionId::next(),
                config,
                accepted,
                lifecycle: AsyncMutex::new(()),
                state,
                reader: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                local_addr: Mutex::new(None),
                remote_addr: Mutex::new(remote_addr),
                last_activity: Mutex::new(None),
                generation: AtomicU64::new(0),
                read_outstanding: AtomicBool::new(false),
                receive_armed: AtomicBool::new(false),
                cancel: Mutex::new(CancellationToken::new()),
                recovery: Mutex::new(FrameRecovery::new(max_frame_length)),
                recv_capacity: AtomicUsize::new(recv_capacity),
                disposed: AtomicBool::new(false),
                reconnects: AtomicU64::new(0),
                handler: Mutex::new(None),
                tracker: TaskTracker::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self { Self { inner } }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<SessionInner> { Arc::downgrade(&self.inner) }

    /// Return the session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId { self.inner.id }

    /// Return the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig { &self.inner.config }

    /// Return the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState { *self.inner.state.borrow() }

    /// Subscribe to lifecycle state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> { self.inner.state.subscribe() }

    /// Whether the session currently holds an established connection.
    #[must_use]
    pub fn is_open(&self) -> bool { self.state().is_open() }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool { self.inner.disposed.load(Ordering::Acquire) }

    /// Whether the session wraps a stream accepted by a listener.
    #[must_use]
    pub fn is_accepted(&self) -> bool { self.inner.accepted }

    /// Local endpoint of the current or most recent connection.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { *lock(&self.inner.local_addr) }

    /// Remote endpoint of the current or most recent connection, or the
    /// configured remote before the first connection.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        (*lock(&self.inner.remote_addr)).or(self.inner.config.remote)
    }

    /// Time of the last successful send or non-empty receive.
    #[must_use]
    pub fn last_activity(&self) -> Option<Instant> { *lock(&self.inner.last_activity) }

    /// Number of automatic reconnects performed so far.
    #[must_use]
    pub fn reconnects(&self) -> u64 { self.inner.reconnects.load(Ordering::Relaxed) }

    /// Largest frame this session sends or accepts.
    #[must_use]
    pub fn max_frame_length(&self) -> usize { self.inner.config.max_frame_length }

    /// Bytes requested from the socket per read when no frame is pending.
    #[must_use]
    pub fn recv_capacity(&self) -> usize { self.inner.recv_capacity.load(Ordering::Relaxed) }

    /// Whether an asynchronous receive loop currently owns the read half.
    #[must_use]
    pub fn is_receiving(&self) -> bool { self.inner.read_outstanding.load(Ordering::Acquire) }

    /// Whether a frame handler is installed.
    #[must_use]
    pub fn has_handler(&self) -> bool { lock(&self.inner.handler).is_some() }

    /// Install the handler used by [`receive_async`](Self::receive_async).
    ///
    /// A running receive loop picks up the new handler for the next frame.
    pub fn set_handler(&self, handler: Arc<dyn FrameHandler>) {
        *lock(&self.inner.handler) = Some(handler);
    }

    /// Open the connection if it is not open yet.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotOpen`] when no remote endpoint is
    /// configured or the session was accepted and has since closed, and
    /// [`SessionError::Connect`] when the connection attempt fails. A failed
    /// attempt leaves the session closed and is not retried.
    pub async fn open(&self) -> Result<(), SessionError> {
        self.ensure_live()?;
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.open_locked().await
    }

    async fn ensure_open(&self) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.is_open() {
            return Ok(());
        }
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.open_locked().await
    }

    async fn open_locked(&self) -> Result<(), SessionError> {
        if self.is_open() {
            return Ok(());
        }
        let Some(remote) = self.inner.config.remote.filter(|_| !self.inner.accepted) else {
            return Err(SessionError::NotOpen);
        };

        self.set_state(SessionState::Opening);
        match self.connect(remote).await {
            Ok(stream) => {
                self.install(stream).await;
                Ok(())
            }
            Err(source) => {
                self.set_state(SessionState::Closed);
                metrics::inc_errors();
                warn!(session = %self.id(), peer = %remote, error = %source, "connect failed");
                Err(SessionError::Connect {
                    addr: remote,
                    source,
                })
            }
        }
    }

    async fn connect(&self, remote: SocketAddr) -> std::io::Result<TcpStream> {
        let socket = if remote.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        self.inner.config.socket.apply(&socket)?;
        if let Some(local) = bind_address(self.inner.config.local, remote) {
            socket.bind(local)?;
        }
        socket.connect(remote).await
    }

    /// Take ownership of a connected stream and mark the session open.
    async fn install(&self, stream: TcpStream) {
        let local = stream.local_addr().ok();
        let peer = stream.peer_addr().ok();
        if self.inner.config.recv_buffer_size.is_none()
            && let Ok(size) = SockRef::from(&stream).recv_buffer_size()
        {
            self.inner
                .recv_capacity
                .store(size.max(1), Ordering::Relaxed);
        }

        let (reader, writer) = stream.into_split();
        *self.inner.reader.lock().await = Some(reader);
        *self.inner.writer.lock().await = Some(writer);
        *lock(&self.inner.local_addr) = local;
        *lock(&self.inner.remote_addr) = peer;
        *lock(&self.inner.cancel) = CancellationToken::new();
        lock(&self.inner.recovery).reset();
        self.touch();
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.set_state(SessionState::Open);
        metrics::inc_sessions();
        debug!(session = %self.id(), peer = ?peer, local = ?local, "session open");
    }

    /// Close the connection.
    ///
    /// Cancels the receive loop, shuts down and releases both halves of the
    /// connection, and discards any partially received frame. Closing a
    /// closed session does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if shutting down the write half failed.
    /// The session is closed regardless.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.ensure_live()?;
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner.receive_armed.store(false, Ordering::Release);
        self.close_locked().await
    }

    async fn close_locked(&self) -> Result<(), SessionError> {
        if !self.is_open() {
            return Ok(());
        }
        self.set_state(SessionState::Closing);
        lock(&self.inner.cancel).cancel();

        let writer = self.inner.writer.lock().await.take();
        let shutdown = match writer {
            Some(mut writer) => writer.shutdown().await,
            None => Ok(()),
        };
        // Waits for a cancelled receive loop to release the read half.
        self.inner.reader.lock().await.take();
        lock(&self.inner.recovery).reset();

        self.set_state(SessionState::Closed);
        metrics::dec_sessions();
        debug!(session = %self.id(), "session closed");

        shutdown.map_err(|error| {
            warn!(session = %self.id(), %error, "shutdown failed");
            SessionError::from(error)
        })
    }

    /// Close the session permanently.
    ///
    /// Every later operation fails with [`SessionError::Disposed`] without
    /// logging or reconnecting. Disposing twice does nothing.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner.receive_armed.store(false, Ordering::Release);
        if let Err(error) = self.close_locked().await {
            debug!(session = %self.id(), %error, "close during dispose failed");
        }
        self.inner.tracker.close();
        debug!(session = %self.id(), "session disposed");
    }

    /// Write `bytes` verbatim, opening the connection first if needed.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`open`](Self::open) and [`SessionError::Io`]
    /// on a write failure. A write failure closes the session and, when
    /// auto-reconnect is enabled, reconnects it before the error is returned.
    pub async fn send(&self, bytes: &[u8]) -> Result<usize, SessionError> {
        self.ensure_open().await?;
        self.write_all(bytes).await?;
        Ok(bytes.len())
    }

    /// Write `payload` as one length-delimited frame.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Framing`] before anything is written if the
    /// payload exceeds [`max_frame_length`](Self::max_frame_length), and
    /// otherwise the errors of [`send`](Self::send).
    pub async fn send_frame(&self, payload: &[u8]) -> Result<(), SessionError> {
        self.ensure_live()?;
        let frame = encode_frame(payload, self.max_frame_length())?;
        self.ensure_open().await?;
        self.write_all(&frame).await?;
        metrics::inc_frames(Direction::Outbound);
        Ok(())
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<(), SessionError> {
        let generation = self.inner.generation.load(Ordering::Acquire);
        let cancel = lock(&self.inner.cancel).clone();
        let result = {
            let mut writer = self.inner.writer.lock().await;
            let Some(writer) = writer.as_mut() else {
                return Err(SessionError::NotOpen);
            };
            select! {
                biased;

                () = cancel.cancelled() => return Err(SessionError::NotOpen),
                result = writer.write_all(bytes) => result,
            }
        };
        match result {
            Ok(()) => {
                self.touch();
                Ok(())
            }
            Err(error) => {
                warn!(session = %self.id(), %error, "send failed");
                metrics::inc_errors();
                self.recover(generation).await;
                Err(error.into())
            }
        }
    }

    /// Read once into `buf`, opening the connection first if a remote is
    /// configured.
    ///
    /// Returns the number of bytes read; `0` means the peer sent nothing more.
    /// An empty read closes the session when `disconnect_on_empty` is set.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotOpen`] for a closed session without a
    /// remote endpoint, [`SessionError::ReadInProgress`] while the
    /// asynchronous receive loop is running, and [`SessionError::Io`] on a
    /// read failure, which follows the same close and reconnect policy as
    /// [`send`](Self::send).
    pub async fn receive(&self, buf: &mut [u8]) -> Result<usize, SessionError> {
        self.ensure_open().await?;
        if self.is_receiving() {
            return Err(SessionError::ReadInProgress);
        }

        let generation = self.inner.generation.load(Ordering::Acquire);
        let cancel = lock(&self.inner.cancel).clone();
        let result = {
            let mut reader = self.inner.reader.lock().await;
            let Some(reader) = reader.as_mut() else {
                return Err(SessionError::NotOpen);
            };
            select! {
                biased;

                () = cancel.cancelled() => return Err(SessionError::NotOpen),
                result = reader.read(buf) => result,
            }
        };
        match result {
            Ok(0) => {
                if self.inner.config.disconnect_on_empty {
                    self.close_generation(generation).await;
                }
                Ok(0)
            }
            Ok(read) => {
                self.touch();
                Ok(read)
            }
            Err(error) => {
                warn!(session = %self.id(), %error, "receive failed");
                metrics::inc_errors();
                self.recover(generation).await;
                Err(error.into())
            }
        }
    }

    /// Read once into a buffer sized to the receive capacity and return the
    /// bytes read.
    ///
    /// # Errors
    ///
    /// See [`receive`](Self::receive).
    pub async fn receive_bytes(&self) -> Result<Bytes, SessionError> {
        let mut buf = vec![0; self.recv_capacity()];
        let read = self.receive(&mut buf).await?;
        buf.truncate(read);
        Ok(Bytes::from(buf))
    }

    /// Start the asynchronous receive loop, opening the connection first if
    /// needed.
    ///
    /// Returns immediately when a loop is already running. The loop feeds the
    /// installed [`FrameHandler`] until the session closes, and is started
    /// again after every automatic reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoHandler`] when no handler is installed, and
    /// the errors of [`open`](Self::open).
    pub async fn receive_async(&self) -> Result<(), SessionError> {
        self.ensure_live()?;
        if !self.has_handler() {
            return Err(SessionError::NoHandler);
        }
        self.ensure_open().await?;
        self.inner.receive_armed.store(true, Ordering::Release);
        self.arm_receive();
        Ok(())
    }

    fn arm_receive(&self) {
        if self
            .inner
            .read_outstanding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let cancel = lock(&self.inner.cancel).clone();
        let generation = self.inner.generation.load(Ordering::Acquire);
        let session = self.clone();
        tokio::spawn(async move { session.receive_loop(cancel, generation).await });
    }

    async fn receive_loop(self, cancel: CancellationToken, generation: u64) {
        let stop = {
            let mut reader = self.inner.reader.lock().await;
            let stop = match reader.as_mut() {
                Some(reader) => self.read_until_stopped(reader, &cancel).await,
                None => ReadStop::Stopped,
            };
            // Cleared while the read half is still held so that a close
            // followed by a reconnect always sees the loop gone.
            self.inner.read_outstanding.store(false, Ordering::Release);
            stop
        };

        match stop {
            ReadStop::Stopped => self.rearm_if_replaced(generation),
            ReadStop::Empty => {
                debug!(session = %self.id(), "peer sent no more bytes");
                if self.inner.config.disconnect_on_empty {
                    self.close_generation(generation).await;
                }
            }
            ReadStop::Failed(error) => {
                warn!(session = %self.id(), %error, "receive failed");
                metrics::inc_errors();
                self.recover(generation).await;
                self.report_error(&SessionError::Io(error)).await;
            }
            ReadStop::Framing(error) => {
                error!(session = %self.id(), %error, "framing violated, closing session");
                metrics::inc_errors();
                self.close_generation(generation).await;
                self.report_error(&SessionError::Framing(error)).await;
            }
        }
    }

    /// Restart the loop when its connection was replaced before it could
    /// run, since the reconnect saw this loop as still outstanding.
    fn rearm_if_replaced(&self, generation: u64) {
        if self.inner.receive_armed.load(Ordering::Acquire)
            && self.inner.generation.load(Ordering::Acquire) != generation
            && self.is_open()
            && !self.is_disposed()
            && self.has_handler()
        {
            self.arm_receive();
        }
    }

    async fn read_until_stopped(
        &self,
        reader: &mut OwnedReadHalf,
        cancel: &CancellationToken,
    ) -> ReadStop {
        let mut buf = Vec::new();
        loop {
            if cancel.is_cancelled() || !self.is_open() {
                return ReadStop::Stopped;
            }
            buf.resize(self.next_read_size(), 0);
            let read = select! {
                biased;

                () = cancel.cancelled() => return ReadStop::Stopped,
                read = reader.read(&mut buf) => read,
            };
            match read {
                Ok(0) => return ReadStop::Empty,
                Ok(read) => {
                    self.touch();
                    if let Err(error) = self.dispatch(&buf[..read]) {
                        return ReadStop::Framing(error);
                    }
                }
                Err(error) => return ReadStop::Failed(error),
            }
        }
    }

    /// Size of the next read: the exact remainder of a pending frame, or the
    /// receive capacity.
    fn next_read_size(&self) -> usize {
        let pending = match self.inner.config.framing {
            Framing::Raw => None,
            Framing::LengthDelimited => lock(&self.inner.recovery).expected_remaining(),
        };
        pending
            .filter(|remaining| *remaining > 0)
            .unwrap_or_else(|| self.recv_capacity())
    }

    fn dispatch(&self, chunk: &[u8]) -> Result<(), FramingError> {
        let handler = lock(&self.inner.handler).clone();
        match self.inner.config.framing {
            Framing::Raw => {
                if let Some(handler) = handler {
                    self.spawn_handler(handler, Bytes::copy_from_slice(chunk));
                }
            }
            Framing::LengthDelimited => {
                let frames = lock(&self.inner.recovery).push(chunk)?;
                for frame in frames {
                    metrics::inc_frames(Direction::Inbound);
                    if let Some(handler) = &handler {
                        self.spawn_handler(Arc::clone(handler), frame);
                    }
                }
            }
        }
        Ok(())
    }

    fn spawn_handler(&self, handler: Arc<dyn FrameHandler>, frame: Bytes) {
        let session = self.clone();
        self.inner.tracker.spawn(async move {
            let outcome = AssertUnwindSafe(handler.handle_frame(&session, frame))
                .catch_unwind()
                .await;
            if let Err(panic) = outcome {
                let panic = handler::panic_message(panic.as_ref());
                error!(session = %session.id(), %panic, "frame handler panicked");
            }
        });
    }

    async fn report_error(&self, error: &SessionError) {
        let handler = lock(&self.inner.handler).clone();
        if let Some(handler) = handler {
            handler.handle_error(self, error).await;
        }
    }

    /// Wait until every dispatched frame handler has finished.
    pub async fn drain(&self) {
        let tracker = &self.inner.tracker;
        let reopen = !tracker.is_closed();
        tracker.close();
        tracker.wait().await;
        if reopen {
            tracker.reopen();
        }
    }

    async fn close_generation(&self, generation: u64) {
        if self.is_disposed() {
            return;
        }
        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.inner.generation.load(Ordering::Acquire) != generation {
            return;
        }
        if let Err(error) = self.close_locked().await {
            debug!(session = %self.id(), %error, "close failed");
        }
    }

    /// Close the failed connection and, when allowed, dial again.
    ///
    /// Only the first caller for a given connection generation acts; later
    /// callers find the connection already replaced.
    async fn recover(&self, generation: u64) {
        if self.is_disposed() {
            return;
        }
        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.inner.generation.load(Ordering::Acquire) != generation {
            return;
        }
        if let Err(error) = self.close_locked().await {
            debug!(session = %self.id(), %error, "close after failure failed");
        }
        if !self.inner.config.auto_reconnect || self.inner.accepted || self.is_disposed() {
            return;
        }

        match self.open_locked().await {
            Ok(()) => {
                self.inner.reconnects.fetch_add(1, Ordering::Relaxed);
                metrics::inc_reconnects();
                info!(session = %self.id(), peer = ?self.remote_addr(), "session reconnected");
                if self.inner.receive_armed.load(Ordering::Acquire) && self.has_handler() {
                    self.arm_receive();
                }
            }
            Err(error) => {
                warn!(session = %self.id(), %error, "reconnect failed");
            }
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_disposed() {
            Err(SessionError::Disposed)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: SessionState) { self.inner.state.send_replace(state); }

    fn touch(&self) { *lock(&self.inner.last_activity) = Some(Instant::now()); }
}

/// Choose the address to bind before connecting to `remote`.
///
/// An unspecified local address of the wrong family is swapped for the
/// unspecified address of the remote's family, keeping the port.
fn bind_address(local: Option<SocketAddr>, remote: SocketAddr) -> Option<SocketAddr> {
    let local = local?;
    if local.ip().is_unspecified() && local.is_ipv4() != remote.is_ipv4() {
        let ip = if remote.is_ipv4() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        };
        return Some(SocketAddr::new(ip, local.port()));
    }
    Some(local)
}
