//! Entity handles, allocation, and per-entity storage.
//!
//! An [`Entity`] is a lightweight `u64` handle. Handles are allocated in
//! creation order and never reused, which also makes them the ordering key of
//! the sorted entity index.

use std::fmt;

use engine_math::Transform3D;

use crate::component::{ComponentSlot, ComponentTypeId};
use crate::index::IndexKey;

/// A user-defined grouping identifier attached to entities.
pub type Tag = IndexKey;

/// An opaque entity handle.
///
/// Entities carry no data of their own outside the [`World`](crate::World)
/// that created them; the handle stays valid until the entity is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub u64);

impl Entity {
    /// The null / invalid entity sentinel.
    pub const INVALID: Entity = Entity(0);

    /// Create an entity from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates monotonically increasing entity IDs.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator. IDs start at 1 (0 is reserved for [`Entity::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Allocates a fresh entity ID.
    pub fn allocate(&mut self) -> Entity {
        let id = self.next_id;
        self.next_id += 1;
        Entity(id)
    }

    /// Returns the number of entities allocated so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next_id - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the world stores for one live entity.
#[derive(Debug)]
pub(crate) struct EntityRecord {
    /// Entity-level enabled flag.
    pub(crate) enabled: bool,
    /// Local pose, relative to the parent when the entity is nested.
    pub(crate) pose: Transform3D,
    /// Owned components in attach order. At most one per type.
    pub(crate) components: Vec<ComponentSlot>,
    /// Local tag records. Duplicates are kept.
    pub(crate) tags: Vec<Tag>,
}

impl EntityRecord {
    pub(crate) fn new(pose: Transform3D) -> Self {
        Self {
            enabled: true,
            pose,
            components: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub(crate) fn position(&self, type_id: ComponentTypeId) -> Option<usize> {
        self.components.iter().position(|slot| slot.type_id == type_id)
    }

    pub(crate) fn slot(&self, type_id: ComponentTypeId) -> Option<&ComponentSlot> {
        self.components.iter().find(|slot| slot.type_id == type_id)
    }

    pub(crate) fn slot_mut(&mut self, type_id: ComponentTypeId) -> Option<&mut ComponentSlot> {
        self.components
            .iter_mut()
            .find(|slot| slot.type_id == type_id)
    }

    /// Whether a tag record or a component-enabled component still files this
    /// entity under `key`.
    ///
    /// Tags and component types share the key namespace, so removing one of
    /// them must not unindex a key the other still holds.
    pub(crate) fn references_key(&self, key: IndexKey) -> bool {
        self.tags.contains(&key)
            || self
                .components
                .iter()
                .any(|slot| slot.enabled && slot.type_id.key() == key)
    }
}
