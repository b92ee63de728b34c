//! Feature plugins.

use bevy::prelude::*;

use crate::plugins::projectiles::ProjectilesPlugin;

pub mod boss;
pub mod combat;
pub mod core;
pub mod enemies;
pub mod interactables;
pub mod physics;
pub mod pickups;
pub mod player;
pub mod projectiles;
pub mod session;
pub mod world;

// Render-only
pub mod render;

/// Register gameplay plugins that work in headless tests.
///
/// `core` goes first: physics reads `Tunables` while building.
pub fn register_gameplay(app: &mut App) {
    core::plugin(app);
    physics::plugin(app);
    world::plugin(app);
    session::plugin(app);
    combat::plugin(app);
    player::plugin(app);
    enemies::plugin(app);
    boss::plugin(app);
    pickups::plugin(app);
    interactables::plugin(app);
    app.add_plugins(ProjectilesPlugin);
}

/// Register render-only plugins (requires DefaultPlugins / render infra).
pub fn register_render(app: &mut App) {
    render::plugin(app);
}

/// Register all plugins (full app).
pub fn register_all(app: &mut App) {
    register_gameplay(app);
    register_render(app);
}
