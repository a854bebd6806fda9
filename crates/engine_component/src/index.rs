//! Secondary indices over enabled entities and components.
//!
//! Two tables back every "all entities with X" and "all components of type X"
//! query:
//!
//! ```text
//! entities:   key (tag or component type id) → Vec<Entity>, sorted by creation order
//! components: component type id              → Vec<Entity>, unordered (owner of each live component)
//! ```
//!
//! The sorted table is a coalesced set: an entity is present at most once per
//! key, found by binary search. The component table allows O(1) swap-removal
//! because callers never rely on its order.
//!
//! The [`World`](crate::World) keeps both tables exactly in sync with
//! enable/disable, attach/detach and tag mutations; this module only performs
//! the raw insertions and removals.

use std::collections::HashMap;

use tracing::trace;

use crate::component::ComponentTypeId;
use crate::entity::Entity;

/// A key in the entity index. Tags and component type ids share this space.
pub type IndexKey = u32;

/// The entity and component indices.
#[derive(Debug, Default)]
pub struct Index {
    /// Key → enabled entities, sorted.
    entities: HashMap<IndexKey, Vec<Entity>>,
    /// Component type → owners of enabled components of that type.
    components: HashMap<ComponentTypeId, Vec<Entity>>,
}

impl Index {
    /// Create empty indices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// File `entity` under `key`. Returns `false` if it was already present.
    pub fn insert_entity(&mut self, key: IndexKey, entity: Entity) -> bool {
        let table = self.entities.entry(key).or_default();
        match table.binary_search(&entity) {
            Ok(_) => false,
            Err(pos) => {
                table.insert(pos, entity);
                trace!(key, %entity, "indexed entity");
                true
            }
        }
    }

    /// Remove `entity` from `key`. Returns `false` if it was not present.
    pub fn remove_entity(&mut self, key: IndexKey, entity: Entity) -> bool {
        let Some(table) = self.entities.get_mut(&key) else {
            return false;
        };
        match table.binary_search(&entity) {
            Ok(pos) => {
                table.remove(pos);
                trace!(key, %entity, "unindexed entity");
                true
            }
            Err(_) => false,
        }
    }

    /// Index a live component: its owner joins the component table and is
    /// filed under the type's key.
    pub fn insert_component(&mut self, type_id: ComponentTypeId, owner: Entity) {
        self.insert_entity(type_id.key(), owner);
        self.components.entry(type_id).or_default().push(owner);
        trace!(component = %type_id, %owner, "indexed component");
    }

    /// Remove a component from the component table only.
    ///
    /// The entity table is left alone: whether the owner stays filed under the
    /// type's key depends on what else the owner carries, which only the
    /// world knows.
    pub fn remove_component(&mut self, type_id: ComponentTypeId, owner: Entity) -> bool {
        let Some(table) = self.components.get_mut(&type_id) else {
            return false;
        };
        match table.iter().position(|&e| e == owner) {
            Some(pos) => {
                table.swap_remove(pos);
                trace!(component = %type_id, %owner, "unindexed component");
                true
            }
            None => false,
        }
    }

    /// Entities filed under `key`, sorted by creation order.
    #[must_use]
    pub fn entities(&self, key: IndexKey) -> &[Entity] {
        self.entities.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Owners of every enabled component of `type_id`, in no particular order.
    #[must_use]
    pub fn component_owners(&self, type_id: ComponentTypeId) -> &[Entity] {
        self.components.get(&type_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `entity` is filed under `key`.
    #[must_use]
    pub fn contains(&self, key: IndexKey, entity: Entity) -> bool {
        self.entities(key).binary_search(&entity).is_ok()
    }

    /// Returns `true` if no entity or component is indexed anywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.values().all(Vec::is_empty) && self.components.values().all(Vec::is_empty)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.components.clear();
    }
}
