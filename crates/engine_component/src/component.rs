//! Core [`Component`] trait, runtime type identity and type-erased storage.
//!
//! Every piece of data attached to an entity implements [`Component`]. The
//! world stores components behind a type-erased slot so an entity can own any
//! mix of concrete types, at most one of each.
//!
//! ## Runtime Type Identity
//!
//! [`ComponentTypeId`] is a small integer claimed from a process-wide counter
//! the first time a concrete type asks for one. The counter starts at 1 (0 is
//! [`ComponentTypeId::INVALID`]) and ids are never reused, so the same type
//! keeps the same id for the lifetime of the process.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use crate::entity::Entity;
use crate::error::WorldError;
use crate::index::IndexKey;
use crate::world::World;

/// Next unclaimed component type id.
static NEXT_TYPE_ID: AtomicU32 = AtomicU32::new(1);

/// Rust type → claimed id.
static TYPE_IDS: LazyLock<DashMap<TypeId, ComponentTypeId>> = LazyLock::new(DashMap::new);

/// Claimed id → Rust type name, for diagnostics.
static TYPE_NAMES: LazyLock<DashMap<ComponentTypeId, &'static str>> = LazyLock::new(DashMap::new);

/// A unique identifier for a component type, assigned at first use.
///
/// Ids share the index key namespace with tags: `ComponentTypeId(7)` and tag
/// `7` resolve to the same entry in [`Index::entities`](crate::Index::entities).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u32);

impl ComponentTypeId {
    /// The unset / invalid type id. Never handed out by [`ComponentTypeId::of`].
    pub const INVALID: Self = Self(0);

    /// Returns the id for component type `T`, claiming the next free id on
    /// first use.
    ///
    /// Claiming goes through the registry's entry lock, so two threads racing
    /// on the same new type still observe a single id.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        let key = TypeId::of::<T>();
        if let Some(id) = TYPE_IDS.get(&key) {
            return *id;
        }

        *TYPE_IDS.entry(key).or_insert_with(|| {
            let id = Self(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed));
            TYPE_NAMES.insert(id, type_name::<T>());
            id
        })
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the key this type is indexed under.
    #[must_use]
    pub const fn key(self) -> IndexKey {
        self.0
    }

    /// Returns `true` if this is a claimed (non-zero) id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// The Rust type name this id was claimed for, or `"<unknown>"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        TYPE_NAMES.get(&self).map_or("<unknown>", |name| *name)
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name(), self.0)
    }
}

/// The core component trait.
///
/// A component is owned by exactly one entity for its whole life. The hooks
/// let a component react to the lifecycle events the world drives:
///
/// | Hook | Fired when |
/// |------|------------|
/// | [`on_attach`](Component::on_attach) | before the component joins its owner; may `require` dependencies |
/// | [`on_enable`](Component::on_enable) | the component becomes effectively enabled and is indexed |
/// | [`on_disable`](Component::on_disable) | the component stops being effectively enabled and is unindexed |
/// | [`on_remove`](Component::on_remove) | after the component left its owner, right before it is dropped |
///
/// # Examples
///
/// ```rust
/// use engine_component::{Component, World};
///
/// #[derive(Debug, Clone, Default)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
///
/// let mut world = World::new();
/// let entity = world.spawn();
/// world.attach(entity, Health { current: 80.0, max: 100.0 }).unwrap();
/// assert_eq!(world.get::<Health>(entity).unwrap().current, 80.0);
/// ```
pub trait Component: Any + Clone {
    /// Copied ahead of every other component when an entity is duplicated,
    /// so the other copies can observe its final state while attaching.
    const COPY_FIRST: bool = false;

    /// Build an equivalent instance for another entity.
    ///
    /// Used by entity duplication and component assignment. Defaults to
    /// [`Clone::clone`]; components holding links to other entities override
    /// it to drop those links.
    fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Overwrite this component's state with `source`'s.
    ///
    /// Used when an entity copy already holds a component of this type and by
    /// [`World::assign_component`]. Defaults to replacing `self` with
    /// [`duplicate`](Component::duplicate); components holding state bound to
    /// their owner override it to keep that state.
    fn assign(&mut self, source: &Self) {
        *self = source.duplicate();
    }

    /// Called before the component is added to `owner`.
    fn on_attach(&mut self, _world: &mut World, _owner: Entity) -> Result<(), WorldError> {
        Ok(())
    }

    /// Called after the component was added to the index.
    fn on_enable(&mut self, _owner: Entity) {}

    /// Called after the component was removed from the index.
    fn on_disable(&mut self, _owner: Entity) {}

    /// Called once the component has been taken off `owner`. The world is
    /// fully usable here, including removing sibling components.
    fn on_remove(&mut self, _world: &mut World, _owner: Entity) {}
}

/// Object-safe view of a [`Component`], used for heterogeneous storage.
pub(crate) trait ErasedComponent: Any {
    fn component_type_id(&self) -> ComponentTypeId;
    fn copy_first(&self) -> bool;
    fn duplicate_boxed(&self) -> Box<dyn ErasedComponent>;
    fn assign_from(&mut self, other: &dyn ErasedComponent) -> Result<(), WorldError>;
    fn attach(&mut self, world: &mut World, owner: Entity) -> Result<(), WorldError>;
    fn enable(&mut self, owner: Entity);
    fn disable(&mut self, owner: Entity);
    fn remove(&mut self, world: &mut World, owner: Entity);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedComponent for T {
    fn component_type_id(&self) -> ComponentTypeId {
        ComponentTypeId::of::<T>()
    }

    fn copy_first(&self) -> bool {
        T::COPY_FIRST
    }

    fn duplicate_boxed(&self) -> Box<dyn ErasedComponent> {
        Box::new(self.duplicate())
    }

    fn assign_from(&mut self, other: &dyn ErasedComponent) -> Result<(), WorldError> {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => {
                self.assign(other);
                Ok(())
            }
            None => Err(WorldError::ComponentTypeMismatch {
                expected: ComponentTypeId::of::<T>(),
                found: other.component_type_id(),
            }),
        }
    }

    fn attach(&mut self, world: &mut World, owner: Entity) -> Result<(), WorldError> {
        self.on_attach(world, owner)
    }

    fn enable(&mut self, owner: Entity) {
        self.on_enable(owner);
    }

    fn disable(&mut self, owner: Entity) {
        self.on_disable(owner);
    }

    fn remove(&mut self, world: &mut World, owner: Entity) {
        self.on_remove(world, owner);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One owned component on an entity, plus its per-instance enabled flag.
pub(crate) struct ComponentSlot {
    pub(crate) type_id: ComponentTypeId,
    pub(crate) enabled: bool,
    pub(crate) inner: Box<dyn ErasedComponent>,
}

impl ComponentSlot {
    pub(crate) fn new(inner: Box<dyn ErasedComponent>, enabled: bool) -> Self {
        Self {
            type_id: inner.component_type_id(),
            enabled,
            inner,
        }
    }

    pub(crate) fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    pub(crate) fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.inner.as_any_mut().downcast_mut::<T>()
    }
}

impl fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("type_id", &self.type_id)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
