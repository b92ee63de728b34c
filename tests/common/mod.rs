#![allow(dead_code)]

//! Integration test harness.
//!
//! Keep integration tests headless:
//! - `MinimalPlugins` provides core ECS runtime.
//! - we then call `mysterious_forest::game::configure_headless` to install gameplay plugins.
//! - time advances by a fixed 16 ms per `update()`, so every update runs about one
//!   fixed step regardless of how fast the test machine is.

use std::time::Duration;

use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::scene::ScenePlugin;
use bevy::state::app::StatesPlugin;
use bevy::time::TimeUpdateStrategy;

use mysterious_forest::common::rng::CombatRng;
use mysterious_forest::plugins::player::Player;

pub const FRAME: Duration = Duration::from_millis(16);

pub fn app_headless() -> App {
    let mut app = App::new();

    // Add AssetPlugin + ScenePlugin so SceneSpawner exists.
    app.add_plugins((MinimalPlugins, StatesPlugin, AssetPlugin::default(), ScenePlugin));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(FRAME));

    mysterious_forest::game::configure_headless(&mut app);
    app.insert_resource(CombatRng::seeded(42));
    // `App::run` would do this; tests drive `update()` by hand, so finish plugin setup here.
    app.finish();
    app.cleanup();
    app
}

/// Boot and run until the level is populated.
pub fn booted() -> App {
    let mut app = app_headless();
    for _ in 0..3 {
        app.update();
    }
    app
}

/// Update until `done` holds or `max` updates have run. Returns whether it held.
pub fn run_until(app: &mut App, max: usize, mut done: impl FnMut(&mut World) -> bool) -> bool {
    for _ in 0..max {
        app.update();
        if done(app.world_mut()) {
            return true;
        }
    }
    false
}

pub fn player(app: &mut App) -> Entity {
    app.world_mut()
        .query_filtered::<Entity, With<Player>>()
        .single(app.world())
        .expect("exactly one player")
}
