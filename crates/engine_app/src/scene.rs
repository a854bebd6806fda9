//! A small widget tree used to drive the registry.
//!
//! The screen entity owns a [`Dispatcher<Click>`]. Below it sit nested panels
//! and, at the bottom level, buttons that hit-test clicks against their
//! [`Bounds`] and consume the ones that land inside.

use engine_component::{Component, Dispatcher, Entity, Event, Listener, Tag, World, WorldError};
use engine_math::{Transform3D, Vec2, Vec3};
use tracing::debug;

/// Every panel and button.
pub const WIDGET_TAG: Tag = 1 << 20;
/// Leaf widgets that react to clicks.
pub const BUTTON_TAG: Tag = WIDGET_TAG + 1;

/// A pointer press in screen coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Click {
    pub position: Vec2,
}

impl Event for Click {}

/// Axis-aligned screen rectangle, min inclusive, max exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmplt(self.max).all()
    }

    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

impl Component for Bounds {}

/// Press counter for a leaf widget.
#[derive(Debug, Clone, Default)]
pub struct Button {
    pub presses: u32,
}

impl Component for Button {}

/// Shape of the generated tree.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    /// Number of widget levels below the screen; buttons sit on the last.
    pub depth: usize,
    /// Children per panel.
    pub fanout: usize,
}

/// Handles into a built scene.
#[derive(Debug)]
pub struct Scene {
    pub screen: Entity,
    pub buttons: Vec<Entity>,
}

/// Build a screen with `layout.fanout.pow(layout.depth)` buttons laid out
/// left to right in unit cells.
pub fn build(world: &mut World, layout: Layout) -> Result<Scene, WorldError> {
    let screen = world.spawn_root_named("screen")?;
    world.attach(screen, Dispatcher::<Click>::new())?;

    let mut scene = Scene {
        screen,
        buttons: Vec::new(),
    };
    build_level(world, &mut scene, screen, 1, layout)?;
    debug!(buttons = scene.buttons.len(), "scene built");
    Ok(scene)
}

fn build_level(
    world: &mut World,
    scene: &mut Scene,
    parent: Entity,
    level: usize,
    layout: Layout,
) -> Result<(), WorldError> {
    for i in 0..layout.fanout {
        let widget = if level >= layout.depth {
            spawn_button(world, scene.buttons.len())?
        } else {
            let panel = world.spawn_root_named(format!("panel-{level}-{i}"))?;
            world.set_pose(panel, Transform3D::from_position(Vec3::new(i as f32, 0.0, 0.0)))?;
            panel
        };
        world.tag(widget, WIDGET_TAG)?;
        world.add_child(parent, widget)?;

        if level >= layout.depth {
            scene.buttons.push(widget);
        } else {
            build_level(world, scene, widget, level + 1, layout)?;
        }
    }
    Ok(())
}

fn spawn_button(world: &mut World, cell: usize) -> Result<Entity, WorldError> {
    let button = world.spawn_root_named(format!("button-{cell}"))?;
    let min = Vec2::new(cell as f32, 0.0);
    world.attach(button, Bounds {
        min,
        max: min + Vec2::ONE,
    })?;
    world.attach(button, Button::default())?;
    world.attach(button, Listener::new(press))?;
    world.tag(button, BUTTON_TAG)?;
    Ok(button)
}

/// Count the click on `owner` and consume it if it hits.
fn press(world: &mut World, owner: Entity, click: &Click) -> bool {
    let hit = world
        .try_get::<Bounds>(owner)
        .is_some_and(|bounds| bounds.contains(click.position));
    if hit && let Some(button) = world.try_get_mut::<Button>(owner) {
        button.presses += 1;
        debug!(%owner, presses = button.presses, "button pressed");
    }
    hit
}

/// Total presses recorded on enabled buttons.
#[must_use]
pub fn total_presses(world: &World) -> u32 {
    world
        .components_of::<Button>()
        .map(|(_, button)| button.presses)
        .sum()
}
