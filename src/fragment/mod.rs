//! Fragmentation and reassembly of oversized messages.
//!
//! A message whose envelope exceeds the frame capacity is split by a
//! [`Fragmenter`] into fragment envelopes that each fit one frame. The
//! receiving side feeds them to a [`Reassembler`], which accepts fragments in
//! any order and hands back the original stream exactly once when its group
//! completes. Each sub-module focuses on a single concept.

pub mod error;
pub mod fragmenter;
pub mod group;
pub mod header;
pub mod id;
pub mod index;
pub mod payload;
pub mod reassembler;

pub use error::{FragmentError, FragmentationError};
pub use fragmenter::{FragmentBatch, FragmentFrame, Fragmenter};
pub use group::FragmentGroup;
pub use header::FragmentHeader;
pub use id::GroupId;
pub use index::FragmentIndex;
pub use payload::{decode_fragment, encode_fragment};
pub use reassembler::{ReassembledMessage, Reassembler};
