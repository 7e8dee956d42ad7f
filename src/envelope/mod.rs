//! Tagged message envelopes.
//!
//! Every message travels as `[kind][body]`: a one-byte [`MessageKind`]
//! followed by the serializer's encoding of the body. The tag is read before
//! the serializer is involved, so an unknown tag is rejected without touching
//! the body. Envelopes larger than the frame capacity are split into fragment
//! envelopes, tagged [`MessageKind::FRAGMENT`], and rebuilt on the receiving
//! side by [`Envelope::accept`].

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;

pub mod error;
pub mod kind;
pub mod registry;

pub use error::EnvelopeError;
pub use kind::{MessageKind, WireMessage};
pub use registry::KindRegistry;

use crate::{
    codec::{DEFAULT_FRAME_LENGTH, clamp_frame_length},
    fragment::{Fragmenter, Reassembler, decode_fragment},
    metrics::{self, Direction},
    serializer::{BincodeSerializer, Serializer},
};

/// Encoder and decoder for one link's messages.
///
/// An `Envelope` owns the fragment counter for outbound messages and the
/// reassembly state for inbound fragments, so each link should use its own
/// instance. It is `Sync` and is typically shared behind an `Arc`.
///
/// # Examples
///
/// ```
/// use bincode::{BorrowDecode, Encode};
/// use wirelink::{
///     BincodeSerializer,
///     Envelope,
///     KindRegistry,
///     MessageKind,
///     Serializer,
///     WireMessage,
///     serializer::SerializerError,
/// };
///
/// #[derive(Debug, PartialEq, Encode, BorrowDecode)]
/// struct Note(String);
///
/// impl WireMessage for Note {
///     fn kind(&self) -> MessageKind { MessageKind::new(1) }
///
///     fn encode_body<S: Serializer>(&self, serializer: &S) -> Result<Vec<u8>, SerializerError> {
///         serializer.serialize(self)
///     }
/// }
///
/// let registry = KindRegistry::<Note, BincodeSerializer>::new()
///     .register::<Note>(MessageKind::new(1))
///     .expect("kind is free");
/// let envelope = Envelope::bincode(registry).with_max_frame_length(32);
///
/// let note = Note("x".repeat(100));
/// let frames = envelope.encode_frames(&note).expect("encodes");
/// assert!(frames.len() > 1);
///
/// let mut received = None;
/// for frame in frames.into_iter().rev() {
///     received = envelope.accept(frame).expect("valid frame").or(received);
/// }
/// assert_eq!(received, Some(note));
/// ```
#[derive(Debug)]
pub struct Envelope<M, S = BincodeSerializer> {
    registry: KindRegistry<M, S>,
    serializer: S,
    max_frame_length: usize,
    fragmenter: Fragmenter,
    reassembler: Reassembler,
}

impl<M> Envelope<M, BincodeSerializer> {
    /// Create an envelope using [`BincodeSerializer`].
    #[must_use]
    pub fn bincode(registry: KindRegistry<M, BincodeSerializer>) -> Self {
        Self::new(registry, BincodeSerializer)
    }
}

impl<M, S: Serializer> Envelope<M, S> {
    /// Create an envelope with the default frame capacity.
    #[must_use]
    pub fn new(registry: KindRegistry<M, S>, serializer: S) -> Self {
        Self {
            registry,
            serializer,
            max_frame_length: DEFAULT_FRAME_LENGTH,
            fragmenter: Fragmenter::new(),
            reassembler: Reassembler::new(),
        }
    }

    /// Set the largest envelope written as a single frame.
    ///
    /// The value is clamped to the supported frame length range.
    #[must_use]
    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = clamp_frame_length(max_frame_length);
        self
    }

    /// Largest envelope written as a single frame.
    #[must_use]
    pub const fn max_frame_length(&self) -> usize { self.max_frame_length }

    /// Return the kind registry.
    #[must_use]
    pub const fn registry(&self) -> &KindRegistry<M, S> { &self.registry }

    /// Return the serializer.
    #[must_use]
    pub const fn serializer(&self) -> &S { &self.serializer }

    /// Return the inbound reassembly state, for example to purge stale groups.
    #[must_use]
    pub const fn reassembler(&self) -> &Reassembler { &self.reassembler }

    /// Decode a complete, unfragmented envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EmptyFrame`] for an empty frame,
    /// [`EnvelopeError::UnexpectedFragment`] for a fragment envelope,
    /// [`EnvelopeError::UnknownKind`] for an unregistered tag, and
    /// [`EnvelopeError::Deserialize`] when the body cannot be read.
    pub fn decode(&self, frame: Bytes) -> Result<M, EnvelopeError> {
        let (&tag, body) = frame.split_first().ok_or(EnvelopeError::EmptyFrame)?;
        let kind = MessageKind::new(tag);
        if kind.is_reserved() {
            return Err(EnvelopeError::UnexpectedFragment);
        }
        self.registry.decode(kind, &self.serializer, body)
    }

    /// Accept an inbound envelope, reassembling fragments as they arrive.
    ///
    /// Returns `Ok(Some(message))` for an ordinary envelope or for the
    /// fragment that completes its group, and `Ok(None)` while a group is
    /// still missing fragments.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`decode`](Self::decode) and
    /// [`EnvelopeError::Fragment`] when a fragment is malformed or does not
    /// fit its group.
    pub fn accept(&self, frame: Bytes) -> Result<Option<M>, EnvelopeError> {
        match frame.first() {
            None => Err(EnvelopeError::EmptyFrame),
            Some(&tag) if MessageKind::new(tag).is_reserved() => {
                let fragment = decode_fragment(frame.slice(1..))?;
                metrics::inc_fragments(Direction::Inbound, 1);
                trace!(
                    "fragment {}/{} of group {}",
                    fragment.header().index(),
                    fragment.header().count(),
                    fragment.header().group_id()
                );
                match self.reassembler.push(fragment)? {
                    Some(message) => self.decode(message.into_payload()).map(Some),
                    None => Ok(None),
                }
            }
            Some(_) => self.decode(frame).map(Some),
        }
    }
}

impl<M: WireMessage, S: Serializer> Envelope<M, S> {
    /// Encode `message` as a single envelope, regardless of size.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::ReservedKind`] if the message claims the
    /// fragment tag and [`EnvelopeError::Serialize`] if serialization fails.
    pub fn encode(&self, message: &M) -> Result<Bytes, EnvelopeError> {
        let kind = message.kind();
        if kind.is_reserved() {
            return Err(EnvelopeError::ReservedKind(kind));
        }
        let body = message
            .encode_body(&self.serializer)
            .map_err(EnvelopeError::Serialize)?;
        let mut envelope = BytesMut::with_capacity(1 + body.len());
        envelope.put_u8(kind.get());
        envelope.put_slice(&body);
        Ok(envelope.freeze())
    }

    /// Encode `message` as the frames to write, fragmenting when the envelope
    /// exceeds [`max_frame_length`](Self::max_frame_length).
    ///
    /// # Errors
    ///
    /// Returns the errors of [`encode`](Self::encode) and
    /// [`EnvelopeError::Fragmentation`] if splitting fails.
    pub fn encode_frames(&self, message: &M) -> Result<Vec<Bytes>, EnvelopeError> {
        let envelope = self.encode(message)?;
        if envelope.len() <= self.max_frame_length {
            return Ok(vec![envelope]);
        }
        let batch = self.fragmenter.split(envelope, self.max_frame_length)?;
        metrics::inc_fragments(Direction::Outbound, batch.len());
        trace!(
            "split kind {} into {} fragments of group {}",
            message.kind(),
            batch.len(),
            batch.group_id()
        );
        Ok(batch.encode_all())
    }
}
