//! Physics plugin: avian2d with platformer gravity.
//!
//! Walkers (player, slimes, skeletons, dropped pickups) are dynamic bodies with locked
//! rotation. Fliers (boss, shock waves) are kinematic and ignore gravity.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::common::tunables::Tunables;

pub fn plugin(app: &mut App) {
    let (ppm, gravity) = {
        let t = app.world().resource::<Tunables>();
        (t.pixels_per_meter, t.gravity)
    };
    app.add_plugins(PhysicsPlugins::default().with_length_unit(ppm));
    app.insert_resource(Gravity(Vec2::NEG_Y * gravity));
}

/// Components shared by every gravity-bound body. `LinearVelocity` comes in as a
/// required component of `RigidBody`.
pub fn walker_body(collider: Collider) -> impl Bundle {
    (
        RigidBody::Dynamic,
        collider,
        LockedAxes::ROTATION_LOCKED,
        Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
        Restitution::ZERO.with_combine_rule(CoefficientCombine::Min),
    )
}
