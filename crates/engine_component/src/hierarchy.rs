//! Parent/child links between entities and world-space transform resolution.
//!
//! A [`Hierarchy`] component stores an entity's parent and its ordered list of
//! children. Poses are local to the parent; [`World::world_transform`] folds
//! them up the chain. Destroying an entity destroys its children first.

use engine_math::{Mat4, Quat, Vec3};
use tracing::error;

use crate::component::Component;
use crate::entity::Entity;
use crate::error::WorldError;
use crate::world::World;

/// Links an entity into the scene tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    parent: Option<Entity>,
    children: Vec<Entity>,
}

impl Hierarchy {
    /// The parent entity, or `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Direct children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl Component for Hierarchy {
    // Links belong to the original; a copy starts out detached.
    fn duplicate(&self) -> Self {
        Self::default()
    }

    // Links belong to the owner; assigning must not unhook it from its tree.
    fn assign(&mut self, _source: &Self) {}

    fn on_remove(&mut self, world: &mut World, owner: Entity) {
        if let Some(parent) = self.parent.take()
            && let Some(links) = world.try_get_mut::<Hierarchy>(parent)
            && let Some(pos) = links.children.iter().position(|&c| c == owner)
        {
            links.children.remove(pos);
        }

        for child in self.children.drain(..) {
            if let Some(links) = world.try_get_mut::<Hierarchy>(child) {
                links.parent = None;
            }
        }
    }
}

impl World {
    /// Parent `child` under `parent`, detaching it from any previous parent.
    ///
    /// Both entities get a [`Hierarchy`] if they lack one. Parenting an
    /// entity under itself or under one of its descendants is rejected.
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<(), WorldError> {
        if parent == child || self.is_ancestor(child, parent) {
            error!(%parent, %child, "hierarchy cycle rejected");
            return Err(WorldError::HierarchyCycle { parent, child });
        }

        self.require::<Hierarchy>(parent)?;
        let previous = self.require::<Hierarchy>(child)?.parent;
        if previous == Some(parent) {
            return Ok(());
        }
        if let Some(previous) = previous {
            self.remove_child(previous, child);
        }

        self.get_mut::<Hierarchy>(child)?.parent = Some(parent);
        self.get_mut::<Hierarchy>(parent)?.children.push(child);
        Ok(())
    }

    /// Detach `child` from `parent`, making it a root. Returns `false` if
    /// `child` was not a child of `parent`.
    pub fn remove_child(&mut self, parent: Entity, child: Entity) -> bool {
        let Some(links) = self.try_get_mut::<Hierarchy>(parent) else {
            return false;
        };
        let Some(pos) = links.children.iter().position(|&c| c == child) else {
            return false;
        };
        links.children.remove(pos);

        if let Some(links) = self.try_get_mut::<Hierarchy>(child) {
            links.parent = None;
        }
        true
    }

    /// Direct children of `entity`, empty if it has no [`Hierarchy`].
    #[must_use]
    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.try_get::<Hierarchy>(entity)
            .map(Hierarchy::children)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.try_get::<Hierarchy>(entity)?.parent
    }

    /// Returns `true` unless `entity` has a parent.
    #[must_use]
    pub fn is_root(&self, entity: Entity) -> bool {
        self.parent(entity).is_none()
    }

    /// Returns `true` if `ancestor` appears on `entity`'s parent chain.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = self.parent(entity);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// The entity's pose composed with every ancestor's.
    pub fn world_transform(&self, entity: Entity) -> Result<Mat4, WorldError> {
        let local = self.record(entity)?.pose.to_matrix();
        match self.parent(entity) {
            Some(parent) => Ok(self.world_transform(parent)? * local),
            None => Ok(local),
        }
    }

    /// The entity's rotation composed with every ancestor's.
    pub fn world_rotation(&self, entity: Entity) -> Result<Quat, WorldError> {
        let local = self.record(entity)?.pose.rotation;
        match self.parent(entity) {
            Some(parent) => Ok(self.world_rotation(parent)? * local),
            None => Ok(local),
        }
    }

    /// Rotate `entity` so its world forward (`-Z`) points at `target`'s
    /// world position.
    ///
    /// For a nested entity the target and `up` are first brought into the
    /// parent's space, where the entity's local pose lives.
    pub fn look_at(&mut self, entity: Entity, target: Entity, up: Vec3) -> Result<(), WorldError> {
        if entity == target {
            error!(%entity, "entity asked to look at itself");
            return Err(WorldError::SelfLookAt(entity));
        }

        let target_position = self.world_transform(target)?.w_axis.truncate();
        let (point, up) = match self.parent(entity) {
            Some(parent) => {
                let to_parent = self.world_transform(parent)?.inverse();
                (
                    to_parent.transform_point3(target_position),
                    to_parent.transform_vector3(up),
                )
            }
            None => (target_position, up),
        };

        self.look_at_point(entity, point, up)
    }

    /// Rotate `entity` to face `point`, given in its parent's space.
    pub fn look_at_point(&mut self, entity: Entity, point: Vec3, up: Vec3) -> Result<(), WorldError> {
        self.record_mut(entity)?.pose.look_at(point, up);
        Ok(())
    }
}
