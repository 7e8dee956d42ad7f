//! Message kind tags.

use derive_more::{Display, From, Into};

use crate::serializer::{Serializer, SerializerError};

/// One-byte tag identifying a message's concrete type.
///
/// The tag is always the first byte of an envelope. [`MessageKind::FRAGMENT`]
/// is reserved for fragment envelopes and cannot be registered.
///
/// # Examples
///
/// ```
/// use wirelink::MessageKind;
/// let kind = MessageKind::new(3);
/// assert_eq!(kind.get(), 3);
/// assert!(!kind.is_reserved());
/// assert!(MessageKind::FRAGMENT.is_reserved());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0:#04x}")]
pub struct MessageKind(u8);

impl MessageKind {
    /// Tag carried by fragment envelopes.
    pub const FRAGMENT: Self = Self(0xFF);

    /// Create a kind from its tag byte.
    #[must_use]
    pub const fn new(tag: u8) -> Self { Self(tag) }

    /// Return the tag byte.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    /// Whether the tag is reserved for the protocol itself.
    #[must_use]
    pub const fn is_reserved(self) -> bool { self.0 == Self::FRAGMENT.0 }
}

/// A message that can travel inside an envelope.
///
/// Implementors are usually an enum over every message an application
/// exchanges; `kind` picks the tag and `encode_body` serializes the variant's
/// payload so that the decoder registered for that tag can read it back.
///
/// # Examples
///
/// ```
/// use bincode::{BorrowDecode, Encode};
/// use wirelink::{MessageKind, Serializer, WireMessage, serializer::SerializerError};
///
/// #[derive(Encode, BorrowDecode)]
/// struct Ping(u32);
///
/// impl WireMessage for Ping {
///     fn kind(&self) -> MessageKind { MessageKind::new(1) }
///
///     fn encode_body<S: Serializer>(&self, serializer: &S) -> Result<Vec<u8>, SerializerError> {
///         serializer.serialize(self)
///     }
/// }
/// ```
pub trait WireMessage: Send + Sync + 'static {
    /// Tag identifying this message's concrete type.
    fn kind(&self) -> MessageKind;

    /// Serialize the message body, excluding the tag.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `serializer`.
    fn encode_body<S: Serializer>(&self, serializer: &S) -> Result<Vec<u8>, SerializerError>;
}
