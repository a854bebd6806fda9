//! Typed events delivered down the entity hierarchy.
//!
//! A [`Dispatcher<E>`] on an entity turns its subtree into a delivery target
//! for events of type `E`. Dispatch visits the subtree breadth-first per
//! level: every direct child's [`Listener<E>`] is offered the event before any
//! grandchild is, and the first listener whose callback returns `true`
//! consumes the event and stops delivery.
//!
//! ```text
//!            Dispatcher
//!           /          \
//!      Child1          Child2        <- offered first, in child order
//!        |
//!    Grandchild                      <- offered after both children
//! ```
//!
//! Callbacks receive `&mut World` and may freely mutate it, including the
//! hierarchy being walked. Child lists are re-read by index after every
//! callback, so removed entities are simply not visited.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::trace;

use crate::component::Component;
use crate::entity::Entity;
use crate::error::WorldError;
use crate::hierarchy::Hierarchy;
use crate::world::World;

/// Marker for event payload types.
pub trait Event: 'static {}

/// A listener callback, given the listener's owner. Returning `true`
/// consumes the event.
///
/// Callbacks are shared between a listener and its duplicates, so they should
/// act on the `owner` they are handed rather than on a captured entity.
pub type Callback<E> = Rc<dyn Fn(&mut World, Entity, &E) -> bool>;

/// Receives events of type `E` dispatched by an ancestor's [`Dispatcher<E>`].
pub struct Listener<E: Event> {
    callback: Option<Callback<E>>,
}

impl<E: Event> Listener<E> {
    /// A listener that reacts with `callback`.
    pub fn new(callback: impl Fn(&mut World, Entity, &E) -> bool + 'static) -> Self {
        Self {
            callback: Some(Rc::new(callback)),
        }
    }

    pub fn set_callback(&mut self, callback: impl Fn(&mut World, Entity, &E) -> bool + 'static) {
        self.callback = Some(Rc::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

impl<E: Event> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            callback: self.callback.clone(),
        }
    }
}

impl<E: Event> Default for Listener<E> {
    fn default() -> Self {
        Self { callback: None }
    }
}

impl<E: Event> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("has_callback", &self.has_callback())
            .finish()
    }
}

impl<E: Event> Component for Listener<E> {}

/// Makes its owner's subtree a dispatch target for events of type `E`.
///
/// Attaching a dispatcher also gives the owner a [`Hierarchy`].
pub struct Dispatcher<E: Event> {
    _event: PhantomData<fn(&E)>,
}

impl<E: Event> Dispatcher<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _event: PhantomData,
        }
    }
}

impl<E: Event> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E: Event> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatcher")
    }
}

impl<E: Event> Component for Dispatcher<E> {
    fn on_attach(&mut self, world: &mut World, owner: Entity) -> Result<(), WorldError> {
        world.require::<Hierarchy>(owner).map(|_| ())
    }
}

impl World {
    /// Deliver `event` to the subtree below `owner`'s [`Dispatcher<E>`].
    ///
    /// Returns `true` if a listener consumed it, and `false` if none did or
    /// the dispatcher is missing or not effectively enabled.
    pub fn dispatch<E: Event>(&mut self, owner: Entity, event: &E) -> bool {
        if !self.is_component_enabled::<Dispatcher<E>>(owner) {
            return false;
        }
        trace!(%owner, event = std::any::type_name::<E>(), "dispatching event");
        propagate(self, Some(owner), owner, event)
    }

    /// Deliver `event` from every enabled [`Dispatcher<E>`]. Returns the
    /// number of dispatchers whose subtree consumed it.
    ///
    /// The set of dispatchers is fixed when the call starts; one disabled by
    /// an earlier delivery is skipped.
    pub fn broadcast<E: Event>(&mut self, event: &E) -> usize {
        let owners = self.component_owners::<Dispatcher<E>>().to_vec();
        owners
            .into_iter()
            .filter(|&owner| self.dispatch(owner, event))
            .count()
    }

    /// Deliver `event` below `entity` with no dispatcher gating it.
    pub fn distribute<E: Event>(&mut self, entity: Entity, event: &E) -> bool {
        propagate(self, None, entity, event)
    }
}

/// Offer `event` to every direct child of `entity`, then recurse into each
/// child in order. Stops at the first consumer.
fn propagate<E: Event>(
    world: &mut World,
    dispatcher: Option<Entity>,
    entity: Entity,
    event: &E,
) -> bool {
    let mut i = 0;
    while let Some(&child) = world.children(entity).get(i) {
        if let Some(callback) = listener_callback::<E>(world, dispatcher, child)
            && callback(world, child, event)
        {
            trace!(%child, "event consumed");
            return true;
        }
        i += 1;
    }

    let mut i = 0;
    while let Some(&child) = world.children(entity).get(i) {
        if propagate(world, dispatcher, child, event) {
            return true;
        }
        i += 1;
    }

    false
}

/// The callback to invoke on `child`, if its listener is live and the
/// dispatcher driving delivery is still enabled.
fn listener_callback<E: Event>(
    world: &World,
    dispatcher: Option<Entity>,
    child: Entity,
) -> Option<Callback<E>> {
    if let Some(owner) = dispatcher
        && !world.is_component_enabled::<Dispatcher<E>>(owner)
    {
        return None;
    }
    if !world.is_component_enabled::<Listener<E>>(child) {
        return None;
    }
    world.try_get::<Listener<E>>(child)?.callback.clone()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct Click;

    impl Event for Click {}

    struct Key;

    impl Event for Key {}

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn recording(log: &Log, name: &'static str, consume: bool) -> Listener<Click> {
        let log = log.clone();
        Listener::new(move |_world: &mut World, _owner: Entity, _event: &Click| {
            log.borrow_mut().push(name);
            consume
        })
    }

    /// Dispatcher with two children; the first has one child of its own.
    fn tree(world: &mut World, log: &Log, consume: [bool; 3]) -> [Entity; 4] {
        let root = world.spawn_root().unwrap();
        world.attach(root, Dispatcher::<Click>::new()).unwrap();
        let child1 = world.spawn_root().unwrap();
        let child2 = world.spawn_root().unwrap();
        let grandchild = world.spawn_root().unwrap();
        world.add_child(root, child1).unwrap();
        world.add_child(root, child2).unwrap();
        world.add_child(child1, grandchild).unwrap();

        world.attach(child1, recording(log, "child1", consume[0])).unwrap();
        world.attach(child2, recording(log, "child2", consume[1])).unwrap();
        world
            .attach(grandchild, recording(log, "grandchild", consume[2]))
            .unwrap();
        [root, child1, child2, grandchild]
    }

    #[test]
    fn test_children_before_grandchildren() {
        let mut world = World::new();
        let log = Log::default();
        let [root, ..] = tree(&mut world, &log, [false; 3]);

        assert!(!world.dispatch(root, &Click));
        assert_eq!(*log.borrow(), ["child1", "child2", "grandchild"]);
    }

    #[test]
    fn test_consumption_stops_delivery() {
        let mut world = World::new();
        let log = Log::default();
        let [root, ..] = tree(&mut world, &log, [true, false, false]);

        assert!(world.dispatch(root, &Click));
        assert_eq!(*log.borrow(), ["child1"]);
    }

    #[test]
    fn test_disabled_listener_is_skipped() {
        let mut world = World::new();
        let log = Log::default();
        let [root, child1, ..] = tree(&mut world, &log, [true, false, true]);
        world.disable_component::<Listener<Click>>(child1).unwrap();

        assert!(world.dispatch(root, &Click));
        assert_eq!(*log.borrow(), ["child2", "grandchild"]);
    }

    #[test]
    fn test_listener_without_callback_is_skipped() {
        let mut world = World::new();
        let log = Log::default();
        let [root, child1, ..] = tree(&mut world, &log, [true; 3]);
        world.get_mut::<Listener<Click>>(child1).unwrap().clear_callback();

        assert!(world.dispatch(root, &Click));
        assert_eq!(*log.borrow(), ["child2"]);
    }

    #[test]
    fn test_disabled_dispatcher_delivers_nothing() {
        let mut world = World::new();
        let log = Log::default();
        let [root, ..] = tree(&mut world, &log, [true; 3]);
        world.disable_component::<Dispatcher<Click>>(root).unwrap();

        assert!(!world.dispatch(root, &Click));
        assert!(log.borrow().is_empty());
        // Other event types are unaffected by a Click dispatcher.
        assert!(!world.dispatch(root, &Key));
    }

    #[test]
    fn test_distribute_ignores_dispatcher_state() {
        let mut world = World::new();
        let log = Log::default();
        let [root, ..] = tree(&mut world, &log, [false; 3]);
        world.disable(root).unwrap();

        assert!(!world.distribute(root, &Click));
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_broadcast_reaches_enabled_dispatchers_only() {
        let mut world = World::new();
        let log = Log::default();
        let [first, ..] = tree(&mut world, &log, [true, false, false]);
        let [second, ..] = tree(&mut world, &log, [false, true, false]);
        let [third, ..] = tree(&mut world, &log, [true, true, true]);
        world.disable(third).unwrap();

        assert_eq!(world.broadcast(&Click), 2);
        assert_eq!(log.borrow().len(), 3);
        assert!(world.dispatch(first, &Click));
        assert!(world.dispatch(second, &Click));
    }

    #[test]
    fn test_listener_may_destroy_sibling_mid_dispatch() {
        let mut world = World::new();
        let log = Log::default();
        let [root, child1, child2, _] = tree(&mut world, &log, [false; 3]);

        let destroy_log = log.clone();
        world
            .get_mut::<Listener<Click>>(child1)
            .unwrap()
            .set_callback(move |world: &mut World, _owner: Entity, _event: &Click| {
                destroy_log.borrow_mut().push("child1");
                world.destroy(child2);
                false
            });

        assert!(!world.dispatch(root, &Click));
        assert_eq!(*log.borrow(), ["child1", "grandchild"]);
        assert_eq!(world.children(root), &[child1]);
    }

    #[test]
    fn test_dispatcher_requires_hierarchy() {
        let mut world = World::new();
        let e = world.spawn();
        world.attach(e, Dispatcher::<Key>::new()).unwrap();
        assert!(world.has::<Hierarchy>(e));
    }

    #[derive(Debug, Clone, Default)]
    struct Hits(u32);

    impl Component for Hits {}

    #[test]
    fn test_duplicated_listener_acts_on_its_own_owner() {
        let mut world = World::new();
        let root = world.spawn_root().unwrap();
        world.attach(root, Dispatcher::<Click>::new()).unwrap();
        let original = world.spawn_root().unwrap();
        world.add_child(root, original).unwrap();
        world.attach(original, Hits::default()).unwrap();
        world
            .attach(
                original,
                Listener::new(|world: &mut World, owner: Entity, _event: &Click| {
                    if let Some(hits) = world.try_get_mut::<Hits>(owner) {
                        hits.0 += 1;
                    }
                    true
                }),
            )
            .unwrap();

        let copy = world.duplicate(original).unwrap();
        world.add_child(root, copy).unwrap();
        world.disable(original).unwrap();

        assert!(world.dispatch(root, &Click));
        assert_eq!(world.get::<Hits>(copy).unwrap().0, 1);
        assert_eq!(world.get::<Hits>(original).unwrap().0, 0);
    }

    #[test]
    fn test_duplicated_listener_shares_callback() {
        let mut world = World::new();
        let log = Log::default();
        let [root, child1, ..] = tree(&mut world, &log, [false; 3]);
        let copy = world.duplicate(child1).unwrap();
        world.add_child(root, copy).unwrap();

        world.dispatch(root, &Click);
        assert_eq!(*log.borrow(), ["child1", "child2", "child1", "grandchild"]);
    }
}
