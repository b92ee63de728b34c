//! Render plugin (render-only): camera follow and sprite opacity.
//!
//! Gameplay never touches `Sprite` colours. It writes `Opacity`, which lives in the
//! headless build too, and this plugin copies it onto the sprite.
//!
//! ```text
//! OnEnter(InGame): spawn MainCamera
//! PostUpdate:      follow_player (before transform propagation)
//! Update:          sync_opacity (Changed<Opacity> only)
//! ```

use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::state::GameState;
use crate::plugins::player::Player;
use crate::plugins::world::SolidMap;

/// Half the window width; the camera never shows past the level's side walls.
const HALF_VIEW_WIDTH: f32 = 640.0;

/// Desired sprite alpha in `[0, 1]`.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Opacity(pub f32);

impl Default for Opacity {
    fn default() -> Self {
        Self(1.0)
    }
}

#[derive(Component)]
pub struct MainCamera {
    pub responsiveness: f32,
}

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(GameState::InGame), spawn_camera)
        .add_systems(Update, sync_opacity)
        .add_systems(
            PostUpdate,
            follow_player
                .before(TransformSystems::Propagate)
                .run_if(in_state(GameState::InGame)),
        );
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Name::new("MainCamera"),
        Camera2d,
        MainCamera { responsiveness: 5.0 },
        Transform::from_xyz(0.0, 0.0, 999.0),
        DespawnOnExit(GameState::InGame),
    ));
}

fn follow_player(
    time: Res<Time>,
    map: Option<Res<SolidMap>>,
    // Disjointness proof: Player entities are not MainCamera entities.
    q_player: Query<&Transform, (With<Player>, Without<MainCamera>)>,
    mut q_cam: Query<(&mut Transform, &MainCamera), Without<Player>>,
) {
    let (Ok(tf_player), Ok((mut tf_cam, cam))) = (q_player.single(), q_cam.single_mut()) else {
        return;
    };

    let alpha = 1.0 - (-cam.responsiveness * time.delta_secs()).exp();
    let target = tf_player.translation.truncate();
    let current = tf_cam.translation.truncate();
    let mut next = current + (target - current) * alpha;
    if let Some(map) = map.as_deref() {
        let right = map.world_width() - HALF_VIEW_WIDTH;
        if right > HALF_VIEW_WIDTH {
            next.x = next.x.clamp(HALF_VIEW_WIDTH, right);
        }
    }
    tf_cam.translation.x = next.x;
    tf_cam.translation.y = next.y;
}

pub fn sync_opacity(mut q: Query<(&Opacity, &mut Sprite), Changed<Opacity>>) {
    for (opacity, mut sprite) in &mut q {
        sprite.color.set_alpha(opacity.0.clamp(0.0, 1.0));
    }
}
