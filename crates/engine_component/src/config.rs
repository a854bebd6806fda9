//! World configuration.

use serde::Deserialize;

/// Configuration for a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Human-readable world name, attached to lifecycle log events.
    pub name: String,
    /// Number of entities to reserve storage for up front.
    pub entity_capacity: usize,
}

impl WorldConfig {
    /// Create a config with the given name and default capacity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Override the number of entities to reserve storage for.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Parse a config from JSON. Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "world".to_string(),
            entity_capacity: 256,
        }
    }
}
