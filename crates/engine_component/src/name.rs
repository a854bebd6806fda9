//! Human-readable entity names.

use std::fmt;

use crate::component::Component;
use crate::entity::Entity;
use crate::world::World;

/// A display name. Names are not unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Name {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Component for Name {}

impl World {
    /// The entity's [`Name`], if it has one.
    #[must_use]
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.try_get::<Name>(entity).map(Name::as_str)
    }

    /// The oldest enabled entity with the given name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.entities_with::<Name>()
            .iter()
            .copied()
            .find(|&entity| self.name(entity) == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_factories() {
        let mut world = World::new();
        let plain = world.spawn_named("plain").unwrap();
        let root = world.spawn_root_named("root").unwrap();

        assert_eq!(world.name(plain), Some("plain"));
        assert_eq!(world.name(root), Some("root"));
        assert!(world.is_root(root));
        assert_eq!(world.get::<Name>(root).unwrap().to_string(), "root");
    }

    #[test]
    fn test_find_by_name_prefers_oldest_enabled() {
        let mut world = World::new();
        let first = world.spawn_named("button").unwrap();
        let second = world.spawn_named("button").unwrap();
        assert_eq!(world.find_by_name("button"), Some(first));

        world.disable(first).unwrap();
        assert_eq!(world.find_by_name("button"), Some(second));
        assert_eq!(world.find_by_name("label"), None);
    }
}
