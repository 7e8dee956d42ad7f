//! Error types emitted by the fragmentation layer.
//!
//! Outbound splitting and inbound grouping fail for unrelated reasons, so
//! each direction gets its own enum.

use thiserror::Error;

use super::{FragmentIndex, GroupId};

/// Errors produced while grouping or decoding inbound fragments.
///
/// None of the grouping errors mutate the group that reported them.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentError {
    /// The fragment belongs to a different group.
    #[error("fragment group mismatch: expected {expected}, found {found}")]
    GroupMismatch { expected: GroupId, found: GroupId },
    /// Index `0` is never valid.
    #[error("fragment index 0 in group {group_id}")]
    InvalidIndex { group_id: GroupId },
    /// The index exceeds the group's fragment count.
    #[error("fragment index {index} out of range for group {group_id} of {count}")]
    IndexOutOfRange {
        group_id: GroupId,
        index: FragmentIndex,
        count: u32,
    },
    /// The fragment disagrees with the count already learnt for its group.
    #[error("fragment count mismatch in group {group_id}: expected {expected}, found {found}")]
    CountMismatch {
        group_id: GroupId,
        expected: u32,
        found: u32,
    },
    /// The group's stream was requested before every fragment arrived.
    #[error("fragment group {group_id} incomplete: {received} fragments received")]
    Incomplete { group_id: GroupId, received: usize },
    /// A fragment header field could not be decoded.
    #[error("malformed fragment header: invalid {field}")]
    Malformed { field: &'static str },
}

/// Errors produced while splitting outbound streams.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// The frame size leaves no room for payload after the fragment header.
    #[error("frame size {max_frame_size} cannot fit a {header_len}-byte fragment header and payload")]
    FrameTooSmall {
        max_frame_size: usize,
        header_len: usize,
    },
    /// The fragment index cannot advance because it would overflow `u32`.
    #[error("fragment index overflow after {last}")]
    IndexOverflow { last: FragmentIndex },
}
