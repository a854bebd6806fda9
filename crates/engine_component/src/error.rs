//! Registry error types.

use crate::component::ComponentTypeId;
use crate::entity::Entity;

/// Contract violations reported by [`World`](crate::World) operations.
///
/// These are programmer errors: the world logs them at `error` level where
/// they are detected and leaves its own state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The handle does not refer to a live entity.
    #[error("{0} not found")]
    EntityNotFound(Entity),

    /// A second instance of a component type was attached to one entity.
    #[error("{entity} already has a {component} component")]
    DuplicateComponent {
        entity: Entity,
        component: ComponentTypeId,
    },

    /// A required component is missing.
    #[error("{entity} has no {component} component")]
    ComponentNotFound {
        entity: Entity,
        component: ComponentTypeId,
    },

    /// Component state was assigned across two different concrete types.
    #[error("cannot assign a {found} component to a {expected} component")]
    ComponentTypeMismatch {
        expected: ComponentTypeId,
        found: ComponentTypeId,
    },

    /// An entity was asked to look at itself.
    #[error("{0} cannot look at itself")]
    SelfLookAt(Entity),

    /// Parenting would make an entity its own ancestor.
    #[error("parenting {child} under {parent} would create a cycle")]
    HierarchyCycle { parent: Entity, child: Entity },
}
