//! Session identity and lifecycle state.

use std::sync::atomic::{AtomicU64, Ordering};

use derive_more::{Display, From, Into};

/// Identifier assigned to a session for logging and registry lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Into)]
#[display("session-{_0}")]
pub struct SessionId(u64);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

impl SessionId {
    /// Create a [`SessionId`] with the provided value.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(self) -> u64 { self.0 }

    pub(crate) fn next() -> Self { Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)) }
}

/// Lifecycle state of a [`TcpSession`](super::TcpSession).
///
/// Sessions move `Closed → Opening → Open → Closing → Closed`. With
/// auto-reconnect enabled an I/O failure drives an open session through
/// `Closing` and `Closed` back to `Opening` and `Open`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display)]
pub enum SessionState {
    /// No connection is held.
    #[default]
    #[display("closed")]
    Closed,
    /// A connection attempt is in progress.
    #[display("opening")]
    Opening,
    /// The connection is established.
    #[display("open")]
    Open,
    /// The connection is being torn down.
    #[display("closing")]
    Closing,
}

impl SessionState {
    /// Whether the session currently holds an established connection.
    #[must_use]
    pub const fn is_open(self) -> bool { matches!(self, Self::Open) }
}
