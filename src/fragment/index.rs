//! One-based fragment positioning within a group.
//!
//! Provides [`FragmentIndex`], a type-safe wrapper around `u32` with
//! overflow-safe increments. Index `0` never appears in a valid fragment.

use std::num::TryFromIntError;

use derive_more::{Display, From};

/// One-based ordinal describing a fragment's position within its group.
///
/// # Examples
///
/// ```
/// use wirelink::fragment::FragmentIndex;
/// let index = FragmentIndex::first();
/// assert_eq!(index.get(), 1);
/// assert!(index.is_valid());
/// assert!(!FragmentIndex::new(0).is_valid());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("{_0}")]
pub struct FragmentIndex(u32);

impl FragmentIndex {
    /// Construct an index from a `u32` value.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the index of the first fragment of a group.
    #[must_use]
    pub const fn first() -> Self { Self(1) }

    /// Return the underlying numeric value.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Whether the index can appear in a well-formed fragment.
    #[must_use]
    pub const fn is_valid(self) -> bool { self.0 != 0 }

    /// Increment the index, returning `None` on overflow.
    #[must_use]
    pub fn checked_increment(self) -> Option<Self> { self.0.checked_add(1).map(Self) }
}

impl TryFrom<usize> for FragmentIndex {
    type Error = TryFromIntError;

    fn try_from(value: usize) -> Result<Self, Self::Error> { u32::try_from(value).map(Self) }
}

impl From<FragmentIndex> for u32 {
    fn from(value: FragmentIndex) -> Self { value.0 }
}
