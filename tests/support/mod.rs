//! Message types shared by the integration tests.
#![allow(dead_code, reason = "each test binary uses a different subset")]

use bincode::{BorrowDecode, Encode};
use wirelink::{
    BincodeSerializer,
    Envelope,
    KindRegistry,
    MessageKind,
    Serializer,
    WireMessage,
    serializer::SerializerError,
};

pub const CHAT: MessageKind = MessageKind::new(1);
pub const BLOB: MessageKind = MessageKind::new(2);
/// Tag no registry in these tests knows about.
pub const STRAY: MessageKind = MessageKind::new(9);

#[derive(Debug, Clone, PartialEq, Encode, BorrowDecode)]
pub struct Chat {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Encode, BorrowDecode)]
pub struct Blob {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Chat(Chat),
    Blob(Blob),
    /// A chat sent under an unregistered tag.
    Stray(Chat),
}

impl Msg {
    pub fn chat(text: &str) -> Self {
        Self::Chat(Chat {
            text: text.to_owned(),
        })
    }

    pub fn blob(len: usize) -> Self {
        Self::Blob(Blob {
            data: (0..len).map(|i| (i % 253) as u8).collect(),
        })
    }
}

impl From<Chat> for Msg {
    fn from(value: Chat) -> Self { Self::Chat(value) }
}

impl From<Blob> for Msg {
    fn from(value: Blob) -> Self { Self::Blob(value) }
}

impl WireMessage for Msg {
    fn kind(&self) -> MessageKind {
        match self {
            Self::Chat(_) => CHAT,
            Self::Blob(_) => BLOB,
            Self::Stray(_) => STRAY,
        }
    }

    fn encode_body<S: Serializer>(&self, serializer: &S) -> Result<Vec<u8>, SerializerError> {
        match self {
            Self::Chat(chat) | Self::Stray(chat) => serializer.serialize(chat),
            Self::Blob(blob) => serializer.serialize(blob),
        }
    }
}

pub fn registry() -> KindRegistry<Msg, BincodeSerializer> {
    KindRegistry::new()
        .register::<Chat>(CHAT)
        .and_then(|registry| registry.register::<Blob>(BLOB))
        .expect("kinds are distinct")
}

pub fn envelope() -> Envelope<Msg> { Envelope::bincode(registry()) }
