use derive_more::{Display, From, Into};

/// Identifier shared by every fragment split from one message.
///
/// Group ids are issued by a [`Fragmenter`](crate::fragment::Fragmenter) and
/// are only meaningful between the two ends of one link.
///
/// # Examples
///
/// ```
/// use wirelink::fragment::GroupId;
/// let id = GroupId::new(42);
/// assert_eq!(id.get(), 42);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct GroupId(u64);

impl GroupId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}
