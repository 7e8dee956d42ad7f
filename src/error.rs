//! Canonical error and result types for the crate.
//!
//! Each layer reports its own error enum; this module defines the single
//! `WirelinkError` surface that aggregates them for applications that want
//! one error type across framing, envelope, fragmentation and session calls.

use thiserror::Error;

use crate::{
    codec::FramingError,
    envelope::EnvelopeError,
    fragment::{FragmentError, FragmentationError},
    link::LinkError,
    session::SessionError,
};

/// Top-level error type exposed by `wirelink`.
#[derive(Debug, Error)]
pub enum WirelinkError {
    /// The byte stream violated the length-delimited framing.
    #[error(transparent)]
    Framing(#[from] FramingError),
    /// A message could not be encoded or decoded.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// A fragment did not fit its group.
    #[error(transparent)]
    Fragment(#[from] FragmentError),
    /// A message could not be split into fragments.
    #[error(transparent)]
    Fragmentation(#[from] FragmentationError),
    /// A session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// A message link operation failed.
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl WirelinkError {
    /// Returns true if this error came from the transport rather than from
    /// malformed data.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::Io(_) | SessionError::Connect { .. })
                | Self::Link(LinkError::Session(
                    SessionError::Io(_) | SessionError::Connect { .. }
                ))
        )
    }
}

/// Canonical result alias used by `wirelink` public APIs.
pub type Result<T, E = WirelinkError> = std::result::Result<T, E>;
