#![doc(html_root_url = "https://docs.rs/wirelink/latest")]
//! Public API for the `wirelink` library.
//!
//! This crate provides a managed, reconnecting TCP session with
//! length-delimited framing, a tag-dispatched message envelope, and a
//! fragmentation protocol that carries messages larger than a single frame.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod fragment;
pub mod link;
pub mod message;
pub mod metrics;
pub mod serializer;
pub mod session;

pub use codec::{FrameRecovery, FramingError, VarintFrameCodec};
pub use envelope::{Envelope, EnvelopeError, KindRegistry, MessageKind, WireMessage};
pub use error::{Result, WirelinkError};
pub use fragment::{
    FragmentBatch,
    FragmentError,
    FragmentFrame,
    FragmentGroup,
    FragmentHeader,
    FragmentIndex,
    FragmentationError,
    Fragmenter,
    GroupId,
    ReassembledMessage,
    Reassembler,
};
pub use link::{LinkError, MessageHandler, MessageLink};
pub use message::Message;
pub use metrics::{
    Direction,
    ERRORS_TOTAL,
    FRAGMENTS_TOTAL,
    FRAMES_TOTAL,
    RECONNECTS_TOTAL,
    SESSIONS_OPEN,
};
pub use serializer::{BincodeSerializer, Serializer};
pub use session::{
    BackoffConfig,
    FnHandler,
    FrameHandler,
    Framing,
    SessionBuilder,
    SessionConfig,
    SessionError,
    SessionId,
    SessionListener,
    SessionRegistry,
    SessionState,
    SocketOptions,
    TcpSession,
};
