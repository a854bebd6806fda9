//! # engine_component
//!
//! An entity/component registry with a global tag and type index, a parent/
//! child hierarchy, and hierarchical event dispatch.
//!
//! This crate provides:
//!
//! - [`World`] — owns entities, their components and tags, and keeps the
//!   [`Index`] in sync with every mutation.
//! - [`Component`] trait — the contract for data attached to an entity, with
//!   lifecycle hooks for attach, enable, disable and removal.
//! - [`Entity`] — lightweight `u64` entity handles, ordered by creation.
//! - [`Hierarchy`] — parent/child links and world-space transform resolution.
//! - [`Dispatcher`] / [`Listener`] — typed events delivered down a subtree.
//! - [`Name`] — human-readable names used by the named factories.
//! - [`WorldConfig`] / [`WorldError`] — configuration and error types.

pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod hierarchy;
pub mod index;
pub mod name;
pub mod world;

pub use component::{Component, ComponentTypeId};
pub use config::WorldConfig;
pub use entity::{Entity, EntityAllocator, Tag};
pub use error::WorldError;
pub use event::{Callback, Dispatcher, Event, Listener};
pub use hierarchy::Hierarchy;
pub use index::{Index, IndexKey};
pub use name::Name;
pub use world::World;
