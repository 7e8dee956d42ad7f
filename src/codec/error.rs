//! Error types for the framing layer.
//!
//! Framing errors describe a byte stream whose frame boundaries can no longer
//! be trusted. Sessions treat every variant as fatal for the connection: they
//! close rather than guess where the next frame starts.

use std::io;

use thiserror::Error;

/// Wire-level problems detected while recovering frame boundaries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Frame length prefix indicates size exceeding configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Frame size declared by the length prefix, saturated to `usize`.
        size: usize,
        /// Maximum allowed frame size.
        max: usize,
    },

    /// Frame length prefix is malformed or overflows.
    #[error("invalid frame length encoding")]
    InvalidLengthEncoding,
}

impl From<FramingError> for io::Error {
    fn from(error: FramingError) -> Self { io::Error::new(io::ErrorKind::InvalidData, error) }
}
