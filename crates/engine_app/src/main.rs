//! # engine_app — Widget scene driver
//!
//! Builds a widget tree on top of the entity registry and drives it with
//! clicks, exercising dispatch, tagging, enable/disable and teardown.
//!
//! ## Startup Sequence
//!
//! 1. Load the [`WorldConfig`] from `--config` (JSON), or use the defaults.
//! 2. Build a screen with nested panels and a grid of buttons.
//! 3. Click the centre of every button, then broadcast a miss.
//! 4. Disable half the buttons and click again, then clear the world.

mod scene;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use engine_component::{World, WorldConfig};
use engine_math::Vec2;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scene::{BUTTON_TAG, Bounds, Click, Layout, WIDGET_TAG};

#[derive(Parser)]
#[command(name = "engine_app", about = "Drives a widget tree through the entity registry")]
struct Args {
    /// Path to a JSON world configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Widget levels below the screen
    #[arg(short, long, default_value_t = 2)]
    depth: usize,

    /// Children per panel
    #[arg(short, long, default_value_t = 3)]
    fanout: usize,
}

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    info!(world = %config.name, "building scene");

    let mut world = World::with_config(config);
    let scene = scene::build(&mut world, Layout {
        depth: args.depth,
        fanout: args.fanout,
    })?;
    info!(
        entities = world.entity_count(),
        widgets = world.entities_with_tag(WIDGET_TAG).len(),
        buttons = world.entities_with_tag(BUTTON_TAG).len(),
        "scene ready"
    );

    let centres: Vec<Click> = world
        .components_of::<Bounds>()
        .map(|(_, bounds)| Click {
            position: bounds.center(),
        })
        .collect();
    let consumed = centres
        .iter()
        .filter(|click| world.dispatch(scene.screen, *click))
        .count();
    info!(clicks = centres.len(), consumed, "clicked every button");

    let missed = world.broadcast(&Click {
        position: Vec2::splat(-1.0),
    });
    if missed != 0 {
        warn!(missed, "click outside every button was consumed");
    }

    for &button in scene.buttons.iter().step_by(2) {
        world.disable(button)?;
    }
    let consumed = centres
        .iter()
        .filter(|click| world.dispatch(scene.screen, *click))
        .count();
    info!(
        consumed,
        enabled_buttons = world.entities_with_tag(BUTTON_TAG).len(),
        presses = scene::total_presses(&world),
        "clicked again with half the buttons disabled"
    );

    world.clear();
    info!(empty = world.index().is_empty(), "world cleared");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<WorldConfig> {
    let Some(path) = path else {
        return Ok(WorldConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading world config {}", path.display()))?;
    WorldConfig::from_json(&json).with_context(|| format!("parsing world config {}", path.display()))
}
