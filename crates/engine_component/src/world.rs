//! The [`World`]: entity storage, component attachment, tagging and queries.
//!
//! The world owns every entity record and keeps the [`Index`] consistent
//! with each mutation before returning to the caller:
//!
//! - An entity is filed under a key iff it is enabled and either carries that
//!   tag or owns a component-enabled component of that type.
//! - A component is listed in the component table iff it is effectively
//!   enabled (its own flag and its owner's flag).
//!
//! Component hooks run synchronously inside these operations and may mutate
//! the world again. Loops over mutable storage are index based and re-check
//! their bounds after every step so that re-entrant mutation never skips or
//! double-processes an element.

use engine_math::Transform3D;
use std::collections::HashMap;
use tracing::{debug, error};

use crate::component::{Component, ComponentSlot, ComponentTypeId, ErasedComponent};
use crate::config::WorldConfig;
use crate::entity::{Entity, EntityAllocator, EntityRecord, Tag};
use crate::error::WorldError;
use crate::hierarchy::Hierarchy;
use crate::index::Index;
use crate::name::Name;

/// Owns all entities, their components and tags, and the global index.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    allocator: EntityAllocator,
    entities: HashMap<Entity, EntityRecord>,
    index: Index,
}

impl World {
    /// Create an empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create an empty world.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            entities: HashMap::with_capacity(config.entity_capacity),
            config,
            allocator: EntityAllocator::new(),
            index: Index::new(),
        }
    }

    /// The configuration this world was created with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Read-only access to the entity and component indices.
    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    // -- Entity lifecycle --

    /// Create an enabled entity at the origin with no components.
    pub fn spawn(&mut self) -> Entity {
        self.spawn_with_pose(Transform3D::IDENTITY)
    }

    /// Create an enabled entity with the given local pose.
    pub fn spawn_with_pose(&mut self, pose: Transform3D) -> Entity {
        let entity = self.allocator.allocate();
        self.entities.insert(entity, EntityRecord::new(pose));
        debug!(world = %self.config.name, %entity, "spawned entity");
        entity
    }

    /// Create an entity carrying a [`Name`].
    pub fn spawn_named(&mut self, name: impl Into<String>) -> Result<Entity, WorldError> {
        let entity = self.spawn();
        self.attach(entity, Name::new(name))?;
        Ok(entity)
    }

    /// Create an entity carrying a [`Hierarchy`], ready to parent children.
    pub fn spawn_root(&mut self) -> Result<Entity, WorldError> {
        self.spawn_root_with_pose(Transform3D::IDENTITY)
    }

    /// Create a hierarchy root with the given pose.
    pub fn spawn_root_with_pose(&mut self, pose: Transform3D) -> Result<Entity, WorldError> {
        let entity = self.spawn_with_pose(pose);
        self.attach(entity, Hierarchy::default())?;
        Ok(entity)
    }

    /// Create a named hierarchy root.
    pub fn spawn_root_named(&mut self, name: impl Into<String>) -> Result<Entity, WorldError> {
        let entity = self.spawn_root()?;
        self.attach(entity, Name::new(name))?;
        Ok(entity)
    }

    /// Destroy an entity and, through its [`Hierarchy`], all of its
    /// descendants.
    ///
    /// Components are removed last-to-first, then tags are unindexed.
    /// Returns `false` if the entity was not alive.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.entities.contains_key(&entity) {
            return false;
        }

        // A parent owns its children.
        let children = self.children(entity).to_vec();
        for child in children {
            self.destroy(child);
        }

        self.remove_all_components(entity);
        self.remove_all_tags(entity);

        // Hooks may have attached or tagged again during teardown.
        if let Some(record) = self.entities.remove(&entity)
            && record.enabled
        {
            for slot in record.components.iter().filter(|slot| slot.enabled) {
                self.index.remove_component(slot.type_id, entity);
                self.index.remove_entity(slot.type_id.key(), entity);
            }
            for &tag in &record.tags {
                self.index.remove_entity(tag, entity);
            }
        }

        debug!(world = %self.config.name, %entity, "destroyed entity");
        true
    }

    /// Destroy every entity, leaving the world and its indices empty.
    pub fn clear(&mut self) {
        let mut all: Vec<Entity> = self.entities.keys().copied().collect();
        all.sort_unstable();
        for entity in all {
            self.destroy(entity);
        }
        self.index.clear();
    }

    /// Returns `true` if `entity` refers to a live entity.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Copy an entity: pose, tags, and every component through
    /// [`Component::duplicate`].
    ///
    /// [`Component::COPY_FIRST`] components are copied before the rest, which
    /// follow in attach order. When an earlier copy already required a
    /// component of the same type on the new entity, the source state is
    /// assigned onto it instead. A disabled source yields a disabled copy.
    pub fn duplicate(&mut self, source: Entity) -> Result<Entity, WorldError> {
        let record = self.record(source)?;
        let pose = record.pose;
        let enabled = record.enabled;
        let tags = record.tags.clone();
        let mut copies: Vec<(bool, Box<dyn ErasedComponent>)> = record
            .components
            .iter()
            .map(|slot| (slot.enabled, slot.inner.duplicate_boxed()))
            .collect();
        // Stable, so attach order is kept within each group.
        copies.sort_by_key(|(_, component)| !component.copy_first());

        let copy = self.spawn_with_pose(pose);
        if let Err(err) = self.fill_copy(copy, tags, copies, enabled) {
            error!(%source, %copy, %err, "duplication failed, discarding the copy");
            self.destroy(copy);
            return Err(err);
        }

        debug!(world = %self.config.name, %source, %copy, "duplicated entity");
        Ok(copy)
    }

    /// Give a freshly spawned `copy` the tags, components and enabled state
    /// captured from its source.
    fn fill_copy(
        &mut self,
        copy: Entity,
        tags: Vec<Tag>,
        copies: Vec<(bool, Box<dyn ErasedComponent>)>,
        enabled: bool,
    ) -> Result<(), WorldError> {
        for tag in tags {
            self.tag(copy, tag)?;
        }

        for (component_enabled, component) in copies {
            let type_id = component.component_type_id();
            let already_present = self.record(copy)?.position(type_id).is_some();
            if already_present {
                if let Some(slot) = self.record_mut(copy)?.slot_mut(type_id) {
                    slot.inner.assign_from(&*component)?;
                }
                self.set_component_enabled(copy, type_id, component_enabled)?;
            } else {
                self.insert_boxed(copy, component, component_enabled)?;
            }
        }

        if !enabled {
            self.disable(copy)?;
        }
        Ok(())
    }

    // -- Pose --

    /// The entity's local pose.
    #[must_use]
    pub fn pose(&self, entity: Entity) -> Option<&Transform3D> {
        self.entities.get(&entity).map(|record| &record.pose)
    }

    /// Mutable access to the entity's local pose.
    pub fn pose_mut(&mut self, entity: Entity) -> Option<&mut Transform3D> {
        self.entities.get_mut(&entity).map(|record| &mut record.pose)
    }

    /// Replace the entity's local pose.
    pub fn set_pose(&mut self, entity: Entity, pose: Transform3D) -> Result<(), WorldError> {
        self.record_mut(entity)?.pose = pose;
        Ok(())
    }

    // -- Components --

    /// Attach a component to an entity.
    ///
    /// Runs [`Component::on_attach`], appends the component, and if the
    /// entity is enabled indexes it and runs [`Component::on_enable`].
    /// Attaching a type the entity already owns is rejected.
    pub fn attach<T: Component>(&mut self, entity: Entity, component: T) -> Result<&mut T, WorldError> {
        let type_id = ComponentTypeId::of::<T>();
        if self.record(entity)?.position(type_id).is_some() {
            error!(%entity, component = %type_id, "component attached twice");
            return Err(WorldError::DuplicateComponent {
                entity,
                component: type_id,
            });
        }

        self.insert_boxed(entity, Box::new(component), true)?;
        self.get_mut::<T>(entity)
    }

    /// Return the entity's `T`, attaching `T::default()` first if it has none.
    pub fn require<T: Component + Default>(&mut self, entity: Entity) -> Result<&mut T, WorldError> {
        let type_id = ComponentTypeId::of::<T>();
        if self.record(entity)?.position(type_id).is_none() {
            self.insert_boxed(entity, Box::new(T::default()), true)?;
        }
        self.get_mut::<T>(entity)
    }

    /// Attach a copy of `source`'s component of type `type_id` to `destination`.
    pub fn copy_component(
        &mut self,
        destination: Entity,
        source: Entity,
        type_id: ComponentTypeId,
    ) -> Result<(), WorldError> {
        let slot = self
            .record(source)?
            .slot(type_id)
            .ok_or_else(|| component_not_found(source, type_id))?;
        let enabled = slot.enabled;
        let copy = slot.inner.duplicate_boxed();

        if self.record(destination)?.position(type_id).is_some() {
            error!(entity = %destination, component = %type_id, "component copied twice");
            return Err(WorldError::DuplicateComponent {
                entity: destination,
                component: type_id,
            });
        }

        self.insert_boxed(destination, copy, enabled)
    }

    /// Overwrite the state of one component with a copy of another's.
    ///
    /// Both components must exist, and both type ids must name the same
    /// concrete type; the owner of the destination never changes.
    pub fn assign_component(
        &mut self,
        destination: Entity,
        destination_type: ComponentTypeId,
        source: Entity,
        source_type: ComponentTypeId,
    ) -> Result<(), WorldError> {
        let copy = self
            .record(source)?
            .slot(source_type)
            .map(|slot| slot.inner.duplicate_boxed())
            .ok_or_else(|| component_not_found(source, source_type))?;

        let slot = self
            .record_mut(destination)?
            .slot_mut(destination_type)
            .ok_or_else(|| component_not_found(destination, destination_type))?;

        slot.inner.assign_from(&*copy).inspect_err(|err| {
            error!(%destination, %source, %err, "component assignment rejected");
        })
    }

    /// Fetch a component if the entity has one.
    #[must_use]
    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.entities
            .get(&entity)?
            .slot(ComponentTypeId::of::<T>())?
            .downcast_ref::<T>()
    }

    /// Fetch a component mutably if the entity has one.
    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.entities
            .get_mut(&entity)?
            .slot_mut(ComponentTypeId::of::<T>())?
            .downcast_mut::<T>()
    }

    /// Fetch a component the caller expects to be present.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T, WorldError> {
        let type_id = ComponentTypeId::of::<T>();
        self.record(entity)?
            .slot(type_id)
            .and_then(|slot| slot.downcast_ref::<T>())
            .ok_or_else(|| component_not_found(entity, type_id))
    }

    /// Fetch a component mutably, failing if it is absent.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, WorldError> {
        let type_id = ComponentTypeId::of::<T>();
        self.record_mut(entity)?
            .slot_mut(type_id)
            .and_then(|slot| slot.downcast_mut::<T>())
            .ok_or_else(|| component_not_found(entity, type_id))
    }

    /// Returns `true` if the entity owns a `T`, enabled or not.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|record| record.position(ComponentTypeId::of::<T>()).is_some())
    }

    /// Remove and drop the entity's `T`. Returns `false` if it had none.
    pub fn detach<T: Component>(&mut self, entity: Entity) -> bool {
        let type_id = ComponentTypeId::of::<T>();
        let Some(pos) = self
            .entities
            .get(&entity)
            .and_then(|record| record.position(type_id))
        else {
            return false;
        };
        self.remove_slot(entity, pos)
    }

    /// Remove every component, last attached first.
    ///
    /// A component's [`Component::on_remove`] hook may remove siblings; the
    /// bound is re-checked after each removal so none is skipped or removed
    /// twice.
    pub fn remove_all_components(&mut self, entity: Entity) {
        let mut i = self.component_count(entity);
        while i > 0 {
            i -= 1;
            if i < self.component_count(entity) {
                self.remove_slot(entity, i);
            }
        }
    }

    /// Number of components the entity owns.
    #[must_use]
    pub fn component_count(&self, entity: Entity) -> usize {
        self.entities
            .get(&entity)
            .map_or(0, |record| record.components.len())
    }

    /// Type ids of the entity's components, in attach order.
    #[must_use]
    pub fn component_types(&self, entity: Entity) -> Vec<ComponentTypeId> {
        self.entities
            .get(&entity)
            .map(|record| record.components.iter().map(|slot| slot.type_id).collect())
            .unwrap_or_default()
    }

    /// Set the component's own flag. Idempotent.
    pub fn enable_component<T: Component>(&mut self, entity: Entity) -> Result<(), WorldError> {
        self.set_component_enabled(entity, ComponentTypeId::of::<T>(), true)
    }

    /// Clear the component's own flag. Idempotent.
    pub fn disable_component<T: Component>(&mut self, entity: Entity) -> Result<(), WorldError> {
        self.set_component_enabled(entity, ComponentTypeId::of::<T>(), false)
    }

    /// Effective enablement: the component's own flag and its owner's flag.
    #[must_use]
    pub fn is_component_enabled<T: Component>(&self, entity: Entity) -> bool {
        self.entities.get(&entity).is_some_and(|record| {
            record.enabled
                && record
                    .slot(ComponentTypeId::of::<T>())
                    .is_some_and(|slot| slot.enabled)
        })
    }

    /// The component's own flag, regardless of the owner's state.
    #[must_use]
    pub fn is_component_self_enabled<T: Component>(&self, entity: Entity) -> bool {
        self.entities
            .get(&entity)
            .and_then(|record| record.slot(ComponentTypeId::of::<T>()))
            .is_some_and(|slot| slot.enabled)
    }

    // -- Enable / disable --

    /// Enable an entity: index its component-enabled components (firing
    /// [`Component::on_enable`]), then its tags. No-op if already enabled.
    pub fn enable(&mut self, entity: Entity) -> Result<(), WorldError> {
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or_else(|| entity_not_found(entity))?;
        if record.enabled {
            return Ok(());
        }

        for slot in record.components.iter_mut().filter(|slot| slot.enabled) {
            self.index.insert_component(slot.type_id, entity);
            slot.inner.enable(entity);
        }
        for &tag in &record.tags {
            self.index.insert_entity(tag, entity);
        }

        record.enabled = true;
        debug!(world = %self.config.name, %entity, "enabled entity");
        Ok(())
    }

    /// Disable an entity: unindex its component-enabled components (firing
    /// [`Component::on_disable`]), then its tags. No-op if already disabled.
    pub fn disable(&mut self, entity: Entity) -> Result<(), WorldError> {
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or_else(|| entity_not_found(entity))?;
        if !record.enabled {
            return Ok(());
        }

        for slot in record.components.iter_mut().filter(|slot| slot.enabled) {
            self.index.remove_component(slot.type_id, entity);
            self.index.remove_entity(slot.type_id.key(), entity);
            slot.inner.disable(entity);
        }
        for &tag in &record.tags {
            self.index.remove_entity(tag, entity);
        }

        record.enabled = false;
        debug!(world = %self.config.name, %entity, "disabled entity");
        Ok(())
    }

    /// Returns `true` if the entity is alive and enabled.
    #[must_use]
    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.entities.get(&entity).is_some_and(|record| record.enabled)
    }

    // -- Tags --

    /// Add a tag record. While the entity is enabled it is filed under the
    /// tag at once; tagging twice keeps two local records but one index entry.
    pub fn tag(&mut self, entity: Entity, tag: Tag) -> Result<(), WorldError> {
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or_else(|| entity_not_found(entity))?;
        if record.enabled {
            self.index.insert_entity(tag, entity);
        }
        record.tags.push(tag);
        Ok(())
    }

    /// Remove one tag record. Returns `false` if the entity has no such tag.
    ///
    /// The index entry goes away only once nothing on the entity still files
    /// it under that key: neither another record of the same tag nor a
    /// component whose type id equals it.
    pub fn remove_tag(&mut self, entity: Entity, tag: Tag) -> bool {
        let Some(record) = self.entities.get_mut(&entity) else {
            return false;
        };
        let Some(pos) = record.tags.iter().position(|&t| t == tag) else {
            return false;
        };

        record.tags.swap_remove(pos);
        if record.enabled && !record.references_key(tag) {
            self.index.remove_entity(tag, entity);
        }
        true
    }

    /// Remove every tag record.
    pub fn remove_all_tags(&mut self, entity: Entity) {
        let Some(record) = self.entities.get_mut(&entity) else {
            return;
        };

        let tags = std::mem::take(&mut record.tags);
        if record.enabled {
            for tag in tags {
                if !record.references_key(tag) {
                    self.index.remove_entity(tag, entity);
                }
            }
        }
    }

    /// Returns `true` if the entity has at least one record of `tag`.
    #[must_use]
    pub fn has_tag(&self, entity: Entity, tag: Tag) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|record| record.tags.contains(&tag))
    }

    /// The entity's tag records, duplicates included.
    #[must_use]
    pub fn tags(&self, entity: Entity) -> &[Tag] {
        self.entities
            .get(&entity)
            .map(|record| record.tags.as_slice())
            .unwrap_or_default()
    }

    // -- Queries --

    /// Enabled entities filed under `tag`, sorted by creation order.
    ///
    /// The slice is a view into the index; collect it before mutating the
    /// world.
    #[must_use]
    pub fn entities_with_tag(&self, tag: Tag) -> &[Entity] {
        self.index.entities(tag)
    }

    /// Enabled entities filed under `T`'s type key, sorted by creation order.
    #[must_use]
    pub fn entities_with<T: Component>(&self) -> &[Entity] {
        self.index.entities(ComponentTypeId::of::<T>().key())
    }

    /// Owners of every effectively enabled `T`, in no particular order.
    #[must_use]
    pub fn component_owners<T: Component>(&self) -> &[Entity] {
        self.index.component_owners(ComponentTypeId::of::<T>())
    }

    /// Every effectively enabled `T` with its owner.
    pub fn components_of<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.component_owners::<T>()
            .iter()
            .filter_map(move |&owner| self.try_get::<T>(owner).map(|c| (owner, c)))
    }

    // -- Internals --

    pub(crate) fn record(&self, entity: Entity) -> Result<&EntityRecord, WorldError> {
        self.entities
            .get(&entity)
            .ok_or_else(|| entity_not_found(entity))
    }

    pub(crate) fn record_mut(&mut self, entity: Entity) -> Result<&mut EntityRecord, WorldError> {
        self.entities
            .get_mut(&entity)
            .ok_or_else(|| entity_not_found(entity))
    }

    /// Bind an erased component to `entity` and bring it online.
    fn insert_boxed(
        &mut self,
        entity: Entity,
        mut component: Box<dyn ErasedComponent>,
        enabled: bool,
    ) -> Result<(), WorldError> {
        let type_id = component.component_type_id();
        component.attach(self, entity)?;

        let record = self
            .entities
            .get_mut(&entity)
            .ok_or_else(|| entity_not_found(entity))?;
        if record.position(type_id).is_some() {
            error!(%entity, component = %type_id, "component attached itself from on_attach");
            return Err(WorldError::DuplicateComponent {
                entity,
                component: type_id,
            });
        }

        let indexed = record.enabled && enabled;
        record.components.push(ComponentSlot::new(component, enabled));
        if indexed {
            self.index.insert_component(type_id, entity);
            if let Some(slot) = record.components.last_mut() {
                slot.inner.enable(entity);
            }
        }

        debug!(%entity, component = %type_id, "attached component");
        Ok(())
    }

    /// Take the component at `pos` off `entity`, unindex it, and drop it.
    fn remove_slot(&mut self, entity: Entity, pos: usize) -> bool {
        let Some(record) = self.entities.get_mut(&entity) else {
            return false;
        };
        if pos >= record.components.len() {
            return false;
        }

        let mut slot = record.components.remove(pos);
        if record.enabled && slot.enabled {
            self.index.remove_component(slot.type_id, entity);
            if !record.references_key(slot.type_id.key()) {
                self.index.remove_entity(slot.type_id.key(), entity);
            }
            slot.inner.disable(entity);
        }

        slot.inner.remove(self, entity);
        debug!(%entity, component = %slot.type_id, "removed component");
        true
    }

    fn set_component_enabled(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
        enabled: bool,
    ) -> Result<(), WorldError> {
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or_else(|| entity_not_found(entity))?;
        let Some(pos) = record.position(type_id) else {
            return Err(component_not_found(entity, type_id));
        };
        if record.components[pos].enabled == enabled {
            return Ok(());
        }

        record.components[pos].enabled = enabled;
        if !record.enabled {
            return Ok(());
        }

        if enabled {
            self.index.insert_component(type_id, entity);
            record.components[pos].inner.enable(entity);
        } else {
            self.index.remove_component(type_id, entity);
            if !record.references_key(type_id.key()) {
                self.index.remove_entity(type_id.key(), entity);
            }
            record.components[pos].inner.disable(entity);
        }
        Ok(())
    }
}

/// Report a handle that does not refer to a live entity.
fn entity_not_found(entity: Entity) -> WorldError {
    error!(%entity, "entity not found");
    WorldError::EntityNotFound(entity)
}

/// Report a component the caller required but the entity does not own.
fn component_not_found(entity: Entity, component: ComponentTypeId) -> WorldError {
    error!(%entity, %component, "component not found");
    WorldError::ComponentNotFound { entity, component }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
