//! Component identifiers and entity signatures.

use std::fmt;

/// Maximum number of component kinds a single scene can hold.
pub const MAX_COMPONENTS: usize = 32;

/// Per-scene identifier of a component kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Create a component ID from a raw value.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Bitset of the component kinds an entity owns. Bit `i` is [`ComponentId`] `i`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signature(u32);

impl Signature {
    pub const EMPTY: Self = Self(0);

    /// Signature with exactly the given components.
    pub fn of(ids: impl IntoIterator<Item = ComponentId>) -> Self {
        ids.into_iter().fold(Self::EMPTY, Self::with)
    }

    #[must_use]
    pub const fn with(self, id: ComponentId) -> Self {
        Self(self.0 | bit(id))
    }

    #[must_use]
    pub const fn without(self, id: ComponentId) -> Self {
        Self(self.0 & !bit(id))
    }

    #[must_use]
    pub const fn contains(self, id: ComponentId) -> bool {
        self.0 & bit(id) != 0
    }

    /// Whether every bit of `required` is set here.
    #[must_use]
    pub const fn matches(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Mask of `id`. Ids past [`MAX_COMPONENTS`] have no bit.
const fn bit(id: ComponentId) -> u32 {
    match 1_u32.checked_shl(id.0) {
        Some(mask) => mask,
        None => 0,
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:#034b})", self.0)
    }
}
