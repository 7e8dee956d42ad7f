//! Outbound helper that splits serialized messages into fragment envelopes.
//!
//! [`Fragmenter`] cuts a byte stream into slices that each fit, together
//! with their fragment header, inside a caller-supplied frame size. It owns
//! the counter that issues [`GroupId`] values so callers never coordinate
//! identifiers themselves.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use super::{FragmentHeader, FragmentIndex, FragmentationError, GroupId, encode_fragment};
use crate::codec::varint::varint_len;

/// Kind tag byte preceding every fragment header.
const TAG_LEN: usize = 1;

/// Splits byte streams into fragments that fit a maximum frame size.
///
/// Every fragment carries the true fragment count of its group, so a reader
/// learns the group size from whichever fragment arrives first.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use wirelink::fragment::Fragmenter;
///
/// let fragmenter = Fragmenter::new();
/// let batch = fragmenter
///     .split(Bytes::from(vec![0_u8; 100]), 32)
///     .expect("frame size fits a header");
/// assert!(batch.is_fragmented());
/// assert!(batch.encode_all().iter().all(|frame| frame.len() <= 32));
/// ```
#[derive(Debug)]
pub struct Fragmenter {
    next_group_id: AtomicU64,
}

impl Fragmenter {
    /// Create a fragmenter whose first group id is `1`.
    #[must_use]
    pub const fn new() -> Self { Self::with_starting_id(GroupId::new(1)) }

    /// Create a fragmenter starting from a specific [`GroupId`].
    #[must_use]
    pub const fn with_starting_id(start_at: GroupId) -> Self {
        Self {
            next_group_id: AtomicU64::new(start_at.get()),
        }
    }

    /// Issue the next [`GroupId`]. The counter wraps after `u64::MAX`.
    #[must_use]
    pub fn next_group_id(&self) -> GroupId {
        GroupId::new(self.next_group_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Split `stream` under a fresh [`GroupId`] so that every encoded fragment
    /// envelope is at most `max_frame_size` bytes.
    ///
    /// An empty stream yields a single empty fragment.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::FrameTooSmall`] when `max_frame_size`
    /// cannot hold a fragment header plus one payload byte, or
    /// [`FragmentationError::IndexOverflow`] if more than `u32::MAX`
    /// fragments would be needed.
    pub fn split(
        &self,
        stream: Bytes,
        max_frame_size: usize,
    ) -> Result<FragmentBatch, FragmentationError> {
        Self::split_with_id(self.next_group_id(), stream, max_frame_size)
    }

    /// Split `stream` into fragments tagged with `group_id`.
    ///
    /// # Errors
    ///
    /// See [`split`](Self::split).
    pub fn split_with_id(
        group_id: GroupId,
        stream: Bytes,
        max_frame_size: usize,
    ) -> Result<FragmentBatch, FragmentationError> {
        let mut count_width = 1;
        loop {
            let slices = slice_stream(group_id, &stream, max_frame_size, count_width)?;
            let last = FragmentIndex::try_from(slices.len()).map_err(|_| {
                FragmentationError::IndexOverflow {
                    last: FragmentIndex::new(u32::MAX),
                }
            })?;
            let count = last.get();
            let needed = varint_len(u64::from(count));
            if needed > count_width {
                // A wider count field shrinks every budget, so cut again.
                count_width = needed;
                continue;
            }

            let fragments = slices
                .into_iter()
                .map(|(index, payload)| {
                    FragmentFrame::new(FragmentHeader::new(group_id, index, count), payload)
                })
                .collect();
            return Ok(FragmentBatch::new(group_id, fragments));
        }
    }
}

impl Default for Fragmenter {
    fn default() -> Self { Self::new() }
}

/// Estimate the fragment count from a conservative per-fragment budget.
///
/// The budget subtracts the tag, the group id, a one-byte index, the frame
/// length prefix and a count field as wide as the frame size itself.
fn estimate_count(group_id: GroupId, len: usize, max_frame_size: usize) -> usize {
    let overhead = TAG_LEN + varint_len(group_id.get()) + 1 + varint_len(max_frame_size as u64) + 1;
    let budget = max_frame_size.saturating_sub(overhead).max(1);
    len.div_ceil(budget).max(1)
}

fn slice_stream(
    group_id: GroupId,
    stream: &Bytes,
    max_frame_size: usize,
    count_width: usize,
) -> Result<Vec<(FragmentIndex, Bytes)>, FragmentationError> {
    let fixed = TAG_LEN + varint_len(group_id.get()) + count_width;
    let budget_for = |index: FragmentIndex| {
        let header_len = fixed + varint_len(u64::from(index.get()));
        max_frame_size
            .checked_sub(header_len)
            .filter(|budget| *budget > 0)
            .ok_or(FragmentationError::FrameTooSmall {
                max_frame_size,
                header_len,
            })
    };

    let mut index = FragmentIndex::first();
    if stream.is_empty() {
        budget_for(index)?;
        return Ok(vec![(index, Bytes::new())]);
    }

    let total = stream.len();
    let mut slices = Vec::with_capacity(estimate_count(group_id, total, max_frame_size));
    let mut offset = 0;
    while offset < total {
        let end = (offset + budget_for(index)?).min(total);
        slices.push((index, stream.slice(offset..end)));
        offset = end;
        if offset < total {
            index = index
                .checked_increment()
                .ok_or(FragmentationError::IndexOverflow { last: index })?;
        }
    }
    Ok(slices)
}

/// Header and payload of a single fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentFrame {
    header: FragmentHeader,
    payload: Bytes,
}

impl FragmentFrame {
    /// Construct a new fragment frame.
    #[must_use]
    pub fn new(header: FragmentHeader, payload: Bytes) -> Self { Self { header, payload } }

    /// Return the fragment header.
    #[must_use]
    pub fn header(&self) -> &FragmentHeader { &self.header }

    /// Return the fragment payload bytes.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Encode the fragment as a complete envelope.
    #[must_use]
    pub fn encode(&self) -> Bytes { encode_fragment(&self.header, &self.payload) }

    /// Consume the frame, returning its components.
    #[must_use]
    pub fn into_parts(self) -> (FragmentHeader, Bytes) { (self.header, self.payload) }
}

/// Fragments produced for a single stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    group_id: GroupId,
    fragments: Vec<FragmentFrame>,
}

impl FragmentBatch {
    fn new(group_id: GroupId, fragments: Vec<FragmentFrame>) -> Self {
        debug_assert!(!fragments.is_empty(), "fragment batches must not be empty");
        Self {
            group_id,
            fragments,
        }
    }

    /// Return the [`GroupId`] shared by all fragments.
    #[must_use]
    pub const fn group_id(&self) -> GroupId { self.group_id }

    /// Return the fragments in index order.
    #[must_use]
    pub fn fragments(&self) -> &[FragmentFrame] { self.fragments.as_slice() }

    /// Number of fragments in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.fragments.len() }

    /// Whether the stream required more than one fragment.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.len() > 1 }

    /// Encode every fragment as an envelope, in index order.
    #[must_use]
    pub fn encode_all(&self) -> Vec<Bytes> {
        self.fragments.iter().map(FragmentFrame::encode).collect()
    }

    /// Consume the batch, returning all fragments.
    #[must_use]
    pub fn into_fragments(self) -> Vec<FragmentFrame> { self.fragments }
}

impl IntoIterator for FragmentBatch {
    type Item = FragmentFrame;
    type IntoIter = std::vec::IntoIter<FragmentFrame>;

    fn into_iter(self) -> Self::IntoIter { self.fragments.into_iter() }
}
