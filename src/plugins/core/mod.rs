//! Core plugin: shared resources and global settings.

use bevy::prelude::*;

use crate::common::clock::GameClock;
use crate::common::rng::CombatRng;
use crate::common::tunables::Tunables;

pub fn plugin(app: &mut App) {
    app.init_resource::<Tunables>()
        .init_resource::<GameClock>()
        .init_resource::<CombatRng>()
        .insert_resource(ClearColor(Color::srgb(0.06, 0.09, 0.07)))
        .add_systems(Startup, validate_tunables);
}

/// Bad numbers are reported, not fatal: the game keeps running on what it has.
fn validate_tunables(tunables: Res<Tunables>) {
    match tunables.validate() {
        Ok(()) => debug!("tunables ok"),
        Err(err) => error!("invalid tunables: {err}"),
    }
}
