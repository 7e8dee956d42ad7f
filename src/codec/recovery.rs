//! Recovery of frame boundaries from arbitrarily chunked reads.
//!
//! A TCP read may return half a frame, several frames, or a frame followed by
//! the first bytes of the next one. [`FrameRecovery`] keeps the bytes of the
//! incomplete frame together with its declared length between reads, and
//! reports how many more bytes the pending frame still needs so callers can
//! size their next read precisely.

use bytes::{Buf, Bytes, BytesMut};

use super::{FramingError, checked_frame_length, varint::decode_varint};

/// Partial-frame buffer for length-delimited streams.
///
/// # Examples
///
/// ```
/// use wirelink::codec::FrameRecovery;
///
/// let mut recovery = FrameRecovery::new(1024);
/// assert!(recovery.push(&[3, b'a']).expect("valid prefix").is_empty());
/// assert_eq!(recovery.expected_remaining(), Some(2));
///
/// let frames = recovery.push(&[b'b', b'c', 1]).expect("valid frame");
/// assert_eq!(frames, vec![bytes::Bytes::from_static(b"abc")]);
/// assert_eq!(recovery.expected_remaining(), Some(1));
/// ```
#[derive(Debug)]
pub struct FrameRecovery {
    max_frame_length: usize,
    pending: BytesMut,
    expected: Option<usize>,
}

impl FrameRecovery {
    /// Create a buffer that rejects frames declaring more than
    /// `max_frame_length` bytes.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            max_frame_length,
            pending: BytesMut::new(),
            expected: None,
        }
    }

    /// Maximum frame length accepted by this buffer.
    #[must_use]
    pub const fn max_frame_length(&self) -> usize { self.max_frame_length }

    /// Feed a newly received chunk and return every frame it completes.
    ///
    /// Bytes following the last complete frame are kept as the start of the
    /// next one, including a length prefix split across reads.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::OversizedFrame`] as soon as a prefix declares a
    /// length above the configured maximum, before any of that frame's payload
    /// is consumed, and [`FramingError::InvalidLengthEncoding`] for malformed
    /// prefixes. The buffer should be [`reset`](Self::reset) or discarded
    /// afterwards.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, FramingError> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let expected = match self.expected {
                Some(expected) => expected,
                None => {
                    let Some((declared, prefix_len)) = decode_varint(&self.pending)? else {
                        break;
                    };
                    let expected = checked_frame_length(declared, self.max_frame_length)?;
                    self.pending.advance(prefix_len);
                    self.expected = Some(expected);
                    expected
                }
            };

            if self.pending.len() < expected {
                break;
            }
            frames.push(self.pending.split_to(expected).freeze());
            self.expected = None;
        }
        Ok(frames)
    }

    /// Bytes still missing from the pending frame, if its length is known.
    #[must_use]
    pub fn expected_remaining(&self) -> Option<usize> {
        self.expected
            .map(|expected| expected.saturating_sub(self.pending.len()))
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    #[must_use]
    pub fn pending_len(&self) -> usize { self.pending.len() }

    /// Whether a partial frame or partial prefix is buffered.
    #[must_use]
    pub fn has_pending(&self) -> bool { !self.pending.is_empty() || self.expected.is_some() }

    /// Drop any buffered partial frame.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.expected = None;
    }
}
