//! Message serialization traits.
//!
//! The envelope only needs an object to bytes "write" and a bytes to object
//! "read" contract. [`Serializer`] captures that contract so applications can
//! plug in their own format; [`BincodeSerializer`] is the default.

use std::error::Error;

use crate::message::Message;

/// Boxed error returned by serializers.
pub type SerializerError = Box<dyn Error + Send + Sync>;

/// Trait for serializing and deserializing message bodies.
///
/// # Object Safety
///
/// This trait is not object-safe: its methods are generic over the message
/// type. Use concrete serializer types in API bounds.
pub trait Serializer: Send + Sync + 'static {
    /// Serialize `value` into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    fn serialize<M: Message>(&self, value: &M) -> Result<Vec<u8>, SerializerError>;

    /// Deserialize a message from `bytes`, returning the message and bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be parsed into a message.
    fn deserialize<M: Message>(&self, bytes: &[u8]) -> Result<(M, usize), SerializerError>;
}

/// Serializer using `bincode` with its standard configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn serialize<M: Message>(&self, value: &M) -> Result<Vec<u8>, SerializerError> {
        value.to_bytes().map_err(Into::into)
    }

    fn deserialize<M: Message>(&self, bytes: &[u8]) -> Result<(M, usize), SerializerError> {
        M::from_bytes(bytes).map_err(Into::into)
    }
}
