//! Order-independent accumulation of one group's fragments.
//!
//! [`FragmentGroup`] keeps payloads keyed by index, so fragments may arrive in
//! any order and duplicates are absorbed. The group learns how many fragments
//! to expect from the first fragment carrying a nonzero count and never
//! changes that target afterwards.

use std::{
    collections::BTreeMap,
    time::Instant,
};

use bytes::{Bytes, BytesMut};

use super::{FragmentError, FragmentFrame, FragmentIndex, GroupId};
use crate::{
    envelope::{Envelope, EnvelopeError},
    serializer::Serializer,
};

/// Fragments received so far for one group.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use wirelink::fragment::{FragmentFrame, FragmentGroup, FragmentHeader, FragmentIndex, GroupId};
///
/// let fragment = |index, payload: &'static [u8]| {
///     FragmentFrame::new(
///         FragmentHeader::new(GroupId::new(7), FragmentIndex::new(index), 2),
///         Bytes::from_static(payload),
///     )
/// };
///
/// let mut group = FragmentGroup::new();
/// assert!(!group.add(fragment(2, b"lo")).expect("valid fragment"));
/// assert!(group.add(fragment(1, b"hel")).expect("valid fragment"));
/// assert_eq!(group.stream().expect("complete").as_ref(), b"hello");
/// ```
#[derive(Debug)]
pub struct FragmentGroup {
    group_id: Option<GroupId>,
    target: Option<u32>,
    fragments: BTreeMap<FragmentIndex, Bytes>,
    started_at: Instant,
}

impl FragmentGroup {
    /// Create an empty group whose id is fixed by the first fragment added.
    #[must_use]
    pub fn new() -> Self { Self::started_at(None, Instant::now()) }

    /// Create an empty group that only accepts fragments of `group_id`.
    #[must_use]
    pub fn for_group(group_id: GroupId) -> Self { Self::started_at(Some(group_id), Instant::now()) }

    pub(crate) fn started_at(group_id: Option<GroupId>, started_at: Instant) -> Self {
        Self {
            group_id,
            target: None,
            fragments: BTreeMap::new(),
            started_at,
        }
    }

    /// Return the group id, once known.
    #[must_use]
    pub const fn group_id(&self) -> Option<GroupId> { self.group_id }

    /// Return the number of fragments the group expects, once known.
    #[must_use]
    pub const fn target(&self) -> Option<u32> { self.target }

    /// Number of distinct fragments accumulated.
    #[must_use]
    pub fn len(&self) -> usize { self.fragments.len() }

    /// Whether no fragment has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.fragments.is_empty() }

    /// Whether every fragment of the group has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.target
            .is_some_and(|target| usize::try_from(target).is_ok_and(|target| target == self.len()))
    }

    /// When the group was created.
    #[must_use]
    pub const fn created_at(&self) -> Instant { self.started_at }

    /// Add a fragment.
    ///
    /// Returns `Ok(true)` only for the fragment that completes the group.
    /// Fragments whose index is already present are ignored and return
    /// `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::GroupMismatch`], [`FragmentError::InvalidIndex`],
    /// [`FragmentError::IndexOutOfRange`] or [`FragmentError::CountMismatch`].
    /// The group is left untouched in every error case.
    pub fn add(&mut self, fragment: FragmentFrame) -> Result<bool, FragmentError> {
        let (header, payload) = fragment.into_parts();
        let group_id = header.group_id();
        let index = header.index();

        if let Some(expected) = self.group_id
            && expected != group_id
        {
            return Err(FragmentError::GroupMismatch {
                expected,
                found: group_id,
            });
        }
        if !index.is_valid() {
            return Err(FragmentError::InvalidIndex { group_id });
        }
        if self.fragments.contains_key(&index) {
            return Ok(false);
        }

        let target = match (self.target, header.known_count()) {
            (Some(expected), Some(found)) if expected != found => {
                return Err(FragmentError::CountMismatch {
                    group_id,
                    expected,
                    found,
                });
            }
            (Some(target), _) => Some(target),
            (None, Some(found)) => {
                // A newly learnt target must cover every index already held.
                let highest = self.fragments.keys().next_back().copied().unwrap_or(index);
                let highest = highest.max(index);
                if highest.get() > found {
                    return Err(FragmentError::IndexOutOfRange {
                        group_id,
                        index: highest,
                        count: found,
                    });
                }
                Some(found)
            }
            (None, None) => None,
        };
        if let Some(count) = target
            && index.get() > count
        {
            return Err(FragmentError::IndexOutOfRange {
                group_id,
                index,
                count,
            });
        }

        self.group_id = Some(group_id);
        self.target = target;
        self.fragments.insert(index, payload);
        Ok(self.is_complete())
    }

    /// Concatenate the payloads in ascending index order.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::Incomplete`] until every fragment has arrived.
    pub fn stream(&self) -> Result<Bytes, FragmentError> {
        if !self.is_complete() {
            return Err(FragmentError::Incomplete {
                group_id: self.group_id.unwrap_or(GroupId::new(0)),
                received: self.fragments.len(),
            });
        }
        if self.fragments.len() == 1
            && let Some(only) = self.fragments.values().next()
        {
            return Ok(only.clone());
        }
        let total = self.fragments.values().map(Bytes::len).sum();
        let mut stream = BytesMut::with_capacity(total);
        for payload in self.fragments.values() {
            stream.extend_from_slice(payload);
        }
        Ok(stream.freeze())
    }

    /// Decode the reassembled stream as a message envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Fragment`] while the group is incomplete and
    /// any decoding error raised by `envelope`.
    pub fn message<M, S: Serializer>(&self, envelope: &Envelope<M, S>) -> Result<M, EnvelopeError> {
        envelope.decode(self.stream()?)
    }
}

impl Default for FragmentGroup {
    fn default() -> Self { Self::new() }
}
