//! Inbound helper that stitches fragments back into complete streams.
//!
//! [`Reassembler`] mirrors the outbound [`Fragmenter`](crate::fragment::Fragmenter)
//! by collecting fragments into one [`FragmentGroup`] per
//! [`GroupId`](crate::fragment::GroupId). Groups live in a sharded concurrent
//! map: pushes for different groups proceed independently while pushes for the
//! same group are serialized by the shard lock. Nothing expires on its own;
//! callers decide when to sweep abandoned groups with
//! [`purge_stale_at`](Reassembler::purge_stale_at).

use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::{DashMap, mapref::entry::Entry};

use super::{FragmentError, FragmentFrame, FragmentGroup, GroupId};
use crate::{
    envelope::{Envelope, EnvelopeError},
    serializer::Serializer,
};

/// Stream rebuilt from a complete fragment group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassembledMessage {
    group_id: GroupId,
    payload: Bytes,
}

impl ReassembledMessage {
    /// Construct a new [`ReassembledMessage`].
    #[must_use]
    pub fn new(group_id: GroupId, payload: Bytes) -> Self { Self { group_id, payload } }

    /// Identifier shared by the fragments that formed this message.
    #[must_use]
    pub const fn group_id(&self) -> GroupId { self.group_id }

    /// Borrow the reassembled stream.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Consume the message, returning the stream.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Decode the stream as a message envelope.
    ///
    /// # Errors
    ///
    /// Returns any [`EnvelopeError`] raised by `envelope`.
    pub fn decode<M, S: Serializer>(&self, envelope: &Envelope<M, S>) -> Result<M, EnvelopeError> {
        envelope.decode(self.payload.clone())
    }
}

/// Concurrent fragment reassembler keyed by group id.
#[derive(Debug, Default)]
pub struct Reassembler {
    groups: DashMap<GroupId, FragmentGroup>,
}

impl Reassembler {
    /// Create an empty reassembler.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Process a fragment using the current time.
    ///
    /// Returns `Ok(Some(_))` when the fragment completes its group, which is
    /// then removed, and `Ok(None)` while more fragments are required.
    ///
    /// # Errors
    ///
    /// Returns the [`FragmentError`] raised by the group. The group keeps
    /// the fragments it already held.
    pub fn push(&self, fragment: FragmentFrame) -> Result<Option<ReassembledMessage>, FragmentError> {
        self.push_at(fragment, Instant::now())
    }

    /// Process a fragment using an explicit clock reading for new groups.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn push_at(
        &self,
        fragment: FragmentFrame,
        now: Instant,
    ) -> Result<Option<ReassembledMessage>, FragmentError> {
        let group_id = fragment.header().group_id();
        match self.groups.entry(group_id) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get_mut().add(fragment)? {
                    return Ok(None);
                }
                let group = occupied.remove();
                Ok(Some(ReassembledMessage::new(group_id, group.stream()?)))
            }
            Entry::Vacant(vacant) => {
                let mut group = FragmentGroup::started_at(Some(group_id), now);
                if group.add(fragment)? {
                    return Ok(Some(ReassembledMessage::new(group_id, group.stream()?)));
                }
                vacant.insert(group);
                Ok(None)
            }
        }
    }

    /// Remove groups created more than `max_age` before `now`.
    ///
    /// Returns the identifiers of the evicted groups.
    pub fn purge_stale_at(&self, now: Instant, max_age: Duration) -> Vec<GroupId> {
        let mut evicted = Vec::new();
        self.groups.retain(|group_id, group| {
            let stale = now.saturating_duration_since(group.created_at()) >= max_age;
            if stale {
                evicted.push(*group_id);
            }
            !stale
        });
        evicted
    }

    /// Remove groups older than `max_age`, measured from the current time.
    pub fn purge_stale(&self, max_age: Duration) -> Vec<GroupId> {
        self.purge_stale_at(Instant::now(), max_age)
    }

    /// Number of incomplete groups currently buffered.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.groups.len() }

    /// Number of fragments buffered for `group_id`, if the group exists.
    #[must_use]
    pub fn group_len(&self, group_id: GroupId) -> Option<usize> {
        self.groups.get(&group_id).map(|group| group.len())
    }
}
