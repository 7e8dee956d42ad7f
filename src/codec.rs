//! Length-delimited framing for session byte streams.
//!
//! Every frame on the wire is a base-128 varint length followed by that many
//! payload bytes. [`FrameRecovery`] rebuilds frames from the chunks a session
//! reads, while [`VarintFrameCodec`] offers the same format as a
//! `tokio_util` codec for peers driven through `Framed`.
//!
//! # Error Handling
//!
//! Both paths reject a declared length above the configured maximum before
//! touching the frame payload. See the [`error`] module for the taxonomy.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

pub mod error;
pub mod recovery;
pub mod varint;

pub use error::FramingError;
pub use recovery::FrameRecovery;
use varint::{MAX_VARINT_LEN, decode_varint, put_varint};

/// Minimum frame length in bytes.
///
/// Frame lengths passed to session configuration are clamped to at least this
/// value so a fragment can always carry its header and some payload.
pub const MIN_FRAME_LENGTH: usize = 16;

/// Maximum frame length in bytes (16 MiB).
///
/// Frame lengths passed to session configuration are clamped to at most this
/// value to prevent unbounded memory allocation.
pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// Default frame capacity used when none is configured.
pub const DEFAULT_FRAME_LENGTH: usize = 64 * 1024;

pub(crate) fn clamp_frame_length(value: usize) -> usize {
    value.clamp(MIN_FRAME_LENGTH, MAX_FRAME_LENGTH)
}

/// Validate a decoded length prefix against `max`.
pub(crate) fn checked_frame_length(declared: u64, max: usize) -> Result<usize, FramingError> {
    match usize::try_from(declared) {
        Ok(size) if size <= max => Ok(size),
        Ok(size) => Err(FramingError::OversizedFrame { size, max }),
        Err(_) => Err(FramingError::OversizedFrame {
            size: usize::MAX,
            max,
        }),
    }
}

/// Prefix `payload` with its varint length.
///
/// # Errors
///
/// Returns [`FramingError::OversizedFrame`] when `payload` is longer than
/// `max_frame_length`.
///
/// # Examples
///
/// ```
/// use wirelink::codec::encode_frame;
///
/// let frame = encode_frame(b"hi", 1024).expect("frame fits");
/// assert_eq!(frame.as_ref(), &[2, b'h', b'i']);
/// ```
pub fn encode_frame(payload: &[u8], max_frame_length: usize) -> Result<Bytes, FramingError> {
    let mut dst = BytesMut::with_capacity(MAX_VARINT_LEN + payload.len());
    put_frame(payload, max_frame_length, &mut dst)?;
    Ok(dst.freeze())
}

fn put_frame(payload: &[u8], max: usize, dst: &mut BytesMut) -> Result<(), FramingError> {
    if payload.len() > max {
        return Err(FramingError::OversizedFrame {
            size: payload.len(),
            max,
        });
    }
    dst.reserve(MAX_VARINT_LEN + payload.len());
    put_varint(dst, payload.len() as u64);
    dst.put_slice(payload);
    Ok(())
}

/// Varint length-delimited codec for use with `tokio_util::codec::Framed`.
#[derive(Clone, Copy, Debug)]
pub struct VarintFrameCodec {
    max_frame_length: usize,
}

impl VarintFrameCodec {
    /// Construct a new codec with a maximum frame length.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            max_frame_length: clamp_frame_length(max_frame_length),
        }
    }

    /// Return the maximum frame length accepted by this codec.
    #[must_use]
    pub const fn max_frame_length(&self) -> usize { self.max_frame_length }
}

impl Default for VarintFrameCodec {
    fn default() -> Self { Self::new(DEFAULT_FRAME_LENGTH) }
}

impl Decoder for VarintFrameCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((declared, prefix_len)) = decode_varint(src)? else {
            return Ok(None);
        };
        let length = checked_frame_length(declared, self.max_frame_length)?;
        let needed = prefix_len + length;
        if src.len() < needed {
            src.reserve(needed - src.len());
            return Ok(None);
        }
        src.advance(prefix_len);
        Ok(Some(src.split_to(length).freeze()))
    }
}

impl Encoder<Bytes> for VarintFrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        put_frame(&item, self.max_frame_length, dst).map_err(io::Error::from)
    }
}
