//! Errors raised while encoding and decoding envelopes.

use thiserror::Error;

use super::MessageKind;
use crate::{
    fragment::{FragmentError, FragmentationError},
    serializer::SerializerError,
};

/// Errors produced by the envelope layer.
///
/// Every decoding variant concerns a single frame: the frame is dropped and
/// the session that carried it is unaffected.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// A zero-length frame carries no kind tag.
    #[error("empty frame has no kind tag")]
    EmptyFrame,
    /// No decoder is registered for the tag.
    #[error("unknown message kind {0}")]
    UnknownKind(MessageKind),
    /// A decoder is already registered for the tag.
    #[error("message kind {0} was already registered")]
    DuplicateKind(MessageKind),
    /// The tag is reserved for fragment envelopes.
    #[error("message kind {0} is reserved")]
    ReservedKind(MessageKind),
    /// A fragment envelope was passed where a whole message was expected.
    #[error("fragment envelope cannot be decoded as a message")]
    UnexpectedFragment,
    /// The message body could not be serialized.
    #[error("failed to serialize message body: {0}")]
    Serialize(#[source] SerializerError),
    /// The message body could not be deserialized.
    #[error("failed to deserialize message of kind {kind}: {source}")]
    Deserialize {
        kind: MessageKind,
        #[source]
        source: SerializerError,
    },
    /// An inbound fragment was malformed or inconsistent with its group.
    #[error(transparent)]
    Fragment(#[from] FragmentError),
    /// The envelope could not be split into fragments.
    #[error(transparent)]
    Fragmentation(#[from] FragmentationError),
}
