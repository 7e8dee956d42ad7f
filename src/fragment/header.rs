use super::{FragmentIndex, GroupId};
use crate::codec::varint::varint_len;

/// Header describing a single fragment.
///
/// The `count` field holds the number of fragments in the group. A count of
/// `0` means "unknown"; readers learn the group size from the first fragment
/// that carries a nonzero count.
///
/// # Examples
///
/// ```
/// use wirelink::fragment::{FragmentHeader, FragmentIndex, GroupId};
/// let header = FragmentHeader::new(GroupId::new(7), FragmentIndex::first(), 2);
/// assert_eq!(header.group_id().get(), 7);
/// assert_eq!(header.index().get(), 1);
/// assert_eq!(header.known_count(), Some(2));
/// assert_eq!(header.encoded_len(), 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentHeader {
    group_id: GroupId,
    index: FragmentIndex,
    count: u32,
}

impl FragmentHeader {
    /// Create a new fragment header.
    #[must_use]
    pub const fn new(group_id: GroupId, index: FragmentIndex, count: u32) -> Self {
        Self {
            group_id,
            index,
            count,
        }
    }

    /// Return the group identifier.
    #[must_use]
    pub const fn group_id(&self) -> GroupId { self.group_id }

    /// Return the fragment position within the group.
    #[must_use]
    pub const fn index(&self) -> FragmentIndex { self.index }

    /// Return the raw count field, `0` when unknown.
    #[must_use]
    pub const fn count(&self) -> u32 { self.count }

    /// Return the group size if this fragment carries it.
    #[must_use]
    pub const fn known_count(&self) -> Option<u32> {
        if self.count == 0 {
            None
        } else {
            Some(self.count)
        }
    }

    /// Number of bytes the varint-encoded header fields occupy on the wire.
    ///
    /// The fragment kind tag is not included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        varint_len(self.group_id.get())
            + varint_len(u64::from(self.index.get()))
            + varint_len(u64::from(self.count))
    }
}
