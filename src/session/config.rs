//! Session configuration and socket options.
//!
//! [`SessionConfig`] is plain data: it derives `serde` traits with
//! field-level defaults so applications can embed it in their own
//! configuration files and override only what they need.

use std::{io, net::SocketAddr, time::Duration};

use serde::{Deserialize, Serialize};
use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpSocket, TcpStream};

use crate::codec::{DEFAULT_FRAME_LENGTH, clamp_frame_length};

/// How the receive loop delivers inbound bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Each chunk read from the socket is delivered as-is.
    Raw,
    /// The stream is split into varint length-delimited frames.
    #[default]
    LengthDelimited,
}

/// Configuration for a [`TcpSession`](super::TcpSession).
///
/// # Examples
///
/// ```
/// use wirelink::{Framing, SessionConfig};
///
/// let remote = "127.0.0.1:7000".parse().expect("valid address");
/// let config = SessionConfig {
///     auto_reconnect: false,
///     ..SessionConfig::for_remote(remote)
/// };
/// assert_eq!(config.remote, Some(remote));
/// assert!(config.disconnect_on_empty);
/// assert_eq!(config.framing, Framing::LengthDelimited);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Local endpoint to bind before connecting. The OS picks one when unset.
    pub local: Option<SocketAddr>,
    /// Remote endpoint to connect to. Required for `open`.
    pub remote: Option<SocketAddr>,
    /// Reconnect transparently after an I/O failure.
    pub auto_reconnect: bool,
    /// Close the session when a read returns no bytes.
    pub disconnect_on_empty: bool,
    /// Delivery mode of the receive loop.
    pub framing: Framing,
    /// Largest frame accepted or sent, clamped to the supported range.
    pub max_frame_length: usize,
    /// Receive buffer capacity. Queried from the socket when unset.
    pub recv_buffer_size: Option<usize>,
    /// Options applied to the socket before connecting.
    pub socket: SocketOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local: None,
            remote: None,
            auto_reconnect: true,
            disconnect_on_empty: true,
            framing: Framing::default(),
            max_frame_length: DEFAULT_FRAME_LENGTH,
            recv_buffer_size: None,
            socket: SocketOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration dialling `remote` with default settings.
    #[must_use]
    pub fn for_remote(remote: SocketAddr) -> Self {
        Self {
            remote: Some(remote),
            ..Self::default()
        }
    }

    /// Clamp values to their supported ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirelink::SessionConfig;
    ///
    /// let config = SessionConfig {
    ///     max_frame_length: 1,
    ///     recv_buffer_size: Some(0),
    ///     ..SessionConfig::default()
    /// }
    /// .normalized();
    /// assert_eq!(config.max_frame_length, wirelink::codec::MIN_FRAME_LENGTH);
    /// assert_eq!(config.recv_buffer_size, Some(1));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max_frame_length = clamp_frame_length(self.max_frame_length);
        self.recv_buffer_size = self.recv_buffer_size.map(|size| size.max(1));
        self
    }
}

/// Socket options applied to a session's socket.
///
/// Unset options leave the operating system default in place.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use wirelink::SocketOptions;
///
/// let options = SocketOptions::default()
///     .nodelay(true)
///     .keepalive(Duration::from_secs(30));
/// assert_eq!(options.nodelay, Some(true));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketOptions {
    /// `TCP_NODELAY`.
    pub nodelay: Option<bool>,
    /// Idle time before TCP keepalive probes start.
    pub keepalive: Option<Duration>,
    /// `SO_LINGER` timeout.
    pub linger: Option<Duration>,
    /// `SO_SNDBUF` size in bytes.
    pub send_buffer_size: Option<u32>,
    /// `SO_RCVBUF` size in bytes.
    pub recv_buffer_size: Option<u32>,
    /// `SO_REUSEADDR`, relevant when binding a fixed local endpoint.
    pub reuseaddr: Option<bool>,
}

impl SocketOptions {
    /// Configure `TCP_NODELAY`.
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = Some(enabled);
        self
    }

    /// Enable TCP keepalive probes after `idle`.
    #[must_use]
    pub fn keepalive(mut self, idle: Duration) -> Self {
        self.keepalive = Some(idle);
        self
    }

    /// Configure the linger timeout applied on close.
    #[must_use]
    pub fn linger(mut self, timeout: Duration) -> Self {
        self.linger = Some(timeout);
        self
    }

    /// Configure the socket send buffer size.
    #[must_use]
    pub fn send_buffer_size(mut self, size: u32) -> Self {
        self.send_buffer_size = Some(size);
        self
    }

    /// Configure the socket receive buffer size.
    #[must_use]
    pub fn recv_buffer_size(mut self, size: u32) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }

    /// Configure `SO_REUSEADDR`.
    #[must_use]
    pub fn reuseaddr(mut self, enabled: bool) -> Self {
        self.reuseaddr = Some(enabled);
        self
    }

    /// Apply the options to a socket that has not connected yet.
    pub(crate) fn apply(&self, socket: &TcpSocket) -> io::Result<()> {
        if let Some(enabled) = self.nodelay {
            socket.set_nodelay(enabled)?;
        }
        if let Some(idle) = self.keepalive {
            socket.set_keepalive(true)?;
            SockRef::from(socket).set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
        }
        if let Some(timeout) = self.linger {
            socket.set_linger(Some(timeout))?;
        }
        if let Some(size) = self.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        if let Some(size) = self.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        if let Some(enabled) = self.reuseaddr {
            socket.set_reuseaddr(enabled)?;
        }
        Ok(())
    }

    /// Apply the options that still matter to an accepted stream.
    pub(crate) fn apply_to_stream(&self, stream: &TcpStream) -> io::Result<()> {
        let sock_ref = SockRef::from(stream);
        if let Some(enabled) = self.nodelay {
            stream.set_nodelay(enabled)?;
        }
        if let Some(idle) = self.keepalive {
            sock_ref.set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
        }
        if let Some(timeout) = self.linger {
            sock_ref.set_linger(Some(timeout))?;
        }
        if let Some(size) = self.send_buffer_size {
            sock_ref.set_send_buffer_size(size as usize)?;
        }
        if let Some(size) = self.recv_buffer_size {
            sock_ref.set_recv_buffer_size(size as usize)?;
        }
        Ok(())
    }
}
