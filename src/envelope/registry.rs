//! Startup-time table mapping kind tags to decoders.

use std::{collections::HashMap, fmt};

use super::{EnvelopeError, MessageKind};
use crate::{
    message::Message,
    serializer::{Serializer, SerializerError},
};

type DecodeFn<M, S> = fn(&S, &[u8]) -> Result<M, SerializerError>;

/// Registration table of decode functions keyed by [`MessageKind`].
///
/// Each registered type is deserialized with `S` and converted into the
/// application message type `M`.
///
/// # Examples
///
/// ```
/// use bincode::{BorrowDecode, Encode};
/// use wirelink::{BincodeSerializer, KindRegistry, MessageKind};
///
/// #[derive(Encode, BorrowDecode)]
/// struct Ping(u32);
///
/// enum Msg {
///     Ping(Ping),
/// }
///
/// impl From<Ping> for Msg {
///     fn from(value: Ping) -> Self { Msg::Ping(value) }
/// }
///
/// let registry = KindRegistry::<Msg, BincodeSerializer>::new()
///     .register::<Ping>(MessageKind::new(1))
///     .expect("kind is free");
/// assert!(registry.contains(MessageKind::new(1)));
/// ```
pub struct KindRegistry<M, S> {
    decoders: HashMap<MessageKind, DecodeFn<M, S>>,
}

impl<M, S: Serializer> KindRegistry<M, S> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register `T` as the body type for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::ReservedKind`] for [`MessageKind::FRAGMENT`]
    /// and [`EnvelopeError::DuplicateKind`] if `kind` is already registered.
    pub fn register<T>(mut self, kind: MessageKind) -> Result<Self, EnvelopeError>
    where
        T: Message + Into<M>,
    {
        if kind.is_reserved() {
            return Err(EnvelopeError::ReservedKind(kind));
        }
        if self.decoders.contains_key(&kind) {
            return Err(EnvelopeError::DuplicateKind(kind));
        }
        self.decoders.insert(kind, decode_as::<T, M, S>);
        Ok(self)
    }

    /// Whether a decoder is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: MessageKind) -> bool { self.decoders.contains_key(&kind) }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize { self.decoders.len() }

    /// Whether no kind has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.decoders.is_empty() }

    /// Decode `body` with the decoder registered for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::UnknownKind`] when nothing is registered for
    /// `kind`, or [`EnvelopeError::Deserialize`] when the serializer fails.
    pub fn decode(&self, kind: MessageKind, serializer: &S, body: &[u8]) -> Result<M, EnvelopeError> {
        let decode = self
            .decoders
            .get(&kind)
            .ok_or(EnvelopeError::UnknownKind(kind))?;
        decode(serializer, body).map_err(|source| EnvelopeError::Deserialize { kind, source })
    }
}

impl<M, S: Serializer> Default for KindRegistry<M, S> {
    fn default() -> Self { Self::new() }
}

impl<M, S> fmt::Debug for KindRegistry<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.decoders.keys().copied().collect();
        kinds.sort_unstable();
        f.debug_struct("KindRegistry").field("kinds", &kinds).finish()
    }
}

fn decode_as<T, M, S>(serializer: &S, body: &[u8]) -> Result<M, SerializerError>
where
    T: Message + Into<M>,
    S: Serializer,
{
    let (value, _) = serializer.deserialize::<T>(body)?;
    Ok(value.into())
}
