//! Error types for session operations.

use std::{io, net::SocketAddr};

use thiserror::Error;

use crate::codec::FramingError;

/// Errors emitted by [`TcpSession`](super::TcpSession) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session holds no connection and cannot open one.
    #[error("session is not open")]
    NotOpen,
    /// The session was disposed; no further operations are possible.
    #[error("session has been disposed")]
    Disposed,
    /// The asynchronous receive loop owns the read half.
    #[error("an asynchronous receive is already outstanding")]
    ReadInProgress,
    /// Asynchronous receive was requested without a frame handler.
    #[error("no frame handler is installed")]
    NoHandler,
    /// Connecting to the remote endpoint failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// Transport error on an established connection.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// The byte stream violated the length-delimited framing.
    #[error(transparent)]
    Framing(#[from] FramingError),
}
