//! World plugin: tile level, static colliders and the solid-surface probe.
//!
//! `SolidMap` is the only world query the combat core uses. Every probe takes it as
//! `Option<&SolidMap>` and answers "nothing there" when the map is missing, so a level
//! that failed to load degrades to open space instead of stopping the update loop.

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::bounds::Aabb;
use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::plugins::enemies::EnemyKind;
use crate::plugins::interactables::ChestSize;

pub const TILE: f32 = 24.0;

// ----- Resources -----

/// Grid of solid tiles. Row 0 is the bottom of the level; y grows upward.
#[derive(Resource, Debug, Clone)]
pub struct SolidMap {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl SolidMap {
    pub fn empty(width: usize, height: usize) -> Self {
        Self { width, height, cells: vec![false; width * height] }
    }

    /// Parse rows top-to-bottom; `#` is solid.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut map = Self::empty(width, height);
        for (i, row) in rows.iter().enumerate() {
            let y = height - 1 - i;
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    map.set(x, y, true);
                }
            }
        }
        map
    }

    pub fn set(&mut self, x: usize, y: usize, solid: bool) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = solid;
        }
    }

    #[inline]
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.cells[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn cell_of(p: Vec2) -> (i32, i32) {
        ((p.x / TILE).floor() as i32, (p.y / TILE).floor() as i32)
    }

    pub fn solid_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.cells[y * self.width + x])
    }

    pub fn world_width(&self) -> f32 {
        self.width as f32 * TILE
    }
}

/// Where things start. Read by the spawning systems of each plugin; the player spawn
/// point lives in `PlayerTuning`.
#[derive(Resource, Debug, Clone)]
pub struct LevelLayout {
    pub enemies: Vec<(EnemyKind, Vec2)>,
    pub chests: Vec<(ChestSize, Vec2)>,
    pub save_points: Vec<Vec2>,
    pub boss_origin: Vec2,
}

impl Default for LevelLayout {
    fn default() -> Self {
        // Ground surface sits at y = 48 (two tile rows).
        Self {
            enemies: vec![
                (EnemyKind::Slime, Vec2::new(400.0, 56.0)),
                (EnemyKind::Slime, Vec2::new(700.0, 56.0)),
                (EnemyKind::Skeleton, Vec2::new(1100.0, 64.0)),
                (EnemyKind::Skeleton, Vec2::new(1500.0, 64.0)),
            ],
            chests: vec![
                (ChestSize::Small, Vec2::new(900.0, 58.0)),
                (ChestSize::Large, Vec2::new(1900.0, 60.0)),
            ],
            save_points: vec![Vec2::new(250.0, 60.0), Vec2::new(1700.0, 60.0)],
            boss_origin: Vec2::new(2150.0, 110.0),
        }
    }
}

const LEVEL_ROWS: [&str; 12] = [
    "#..............................................................................................#",
    "#..............................................................................................#",
    "#..............................................................................................#",
    "#..............................................................................................#",
    "#..............................................................................................#",
    "#..............................................................................................#",
    "#..............................................................................................#",
    "#.......................................####...................................................#",
    "#..............................................................................................#",
    "#...........................#..................................................................#",
    "################################################################################################",
    "################################################################################################",
];

pub fn default_level() -> SolidMap {
    SolidMap::from_rows(&LEVEL_ROWS)
}

// ----- Probes -----

pub mod probe {
    use super::*;

    /// Whether a solid tile covers `p`.
    #[inline]
    pub fn solid_at(map: Option<&SolidMap>, p: Vec2) -> bool {
        let Some(map) = map else {
            return false;
        };
        let (x, y) = SolidMap::cell_of(p);
        map.is_solid(x, y)
    }

    /// Standing on something: probe just under both bottom corners.
    pub fn grounded(map: Option<&SolidMap>, body: &Aabb) -> bool {
        let y = body.min().y - 1.0;
        solid_at(map, Vec2::new(body.min().x + 1.0, y)) || solid_at(map, Vec2::new(body.max().x - 1.0, y))
    }

    /// Platform edge in the direction of travel: no floor 20 px ahead, 10 px below the feet.
    pub fn edge_ahead(map: Option<&SolidMap>, body: &Aabb, dir: f32) -> bool {
        if map.is_none() {
            return false;
        }
        let probe = Vec2::new(body.center.x + dir.signum() * 20.0, body.min().y - 10.0);
        !solid_at(map, probe)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum WallSide {
        Left,
        Right,
    }

    /// Wall flush against the body along at least 90% of its height.
    pub fn wall_beside(map: Option<&SolidMap>, body: &Aabb) -> Option<WallSide> {
        map?;
        let height = body.half.y * 2.0;
        let required = ((height * 0.9) / TILE).ceil().max(1.0) as usize;

        let column = |x: f32| {
            let (_, y0) = SolidMap::cell_of(Vec2::new(x, body.min().y));
            let (_, y1) = SolidMap::cell_of(Vec2::new(x, body.max().y));
            (y0..=y1)
                .filter(|&y| solid_at(map, Vec2::new(x, (y as f32 + 0.5) * TILE)))
                .count()
        };

        if column(body.min().x - 2.0) >= required {
            Some(WallSide::Left)
        } else if column(body.max().x + 2.0) >= required {
            Some(WallSide::Right)
        } else {
            None
        }
    }
}

// ----- Plugin -----

pub fn plugin(app: &mut App) {
    app.insert_resource(default_level())
        .insert_resource(LevelLayout::default())
        .add_systems(OnEnter(GameState::InGame), spawn_tiles);
}

/// One static collider per horizontal run of solid tiles.
fn spawn_tiles(mut commands: Commands, map: Option<Res<SolidMap>>) {
    let Some(map) = map else {
        warn!("no solid map; level has no collision");
        return;
    };

    let layers = CollisionLayers::new(Layer::World, [Layer::Player, Layer::Enemy, Layer::Pickup]);
    let tile_color = Color::srgb(0.18, 0.22, 0.16);

    for (y, x0, len) in runs(&map) {
        let size = Vec2::new(len as f32 * TILE, TILE);
        let center = Vec2::new(x0 as f32 * TILE + size.x * 0.5, (y as f32 + 0.5) * TILE);
        commands.spawn((
            Name::new(format!("Ground{x0}_{y}")),
            Sprite::from_color(tile_color, size),
            Transform::from_translation(center.extend(0.0)),
            RigidBody::Static,
            Collider::rectangle(size.x, size.y),
            layers,
            DespawnOnExit(GameState::InGame),
        ));
    }
}

/// Horizontal runs of solid cells as (row, first column, length).
fn runs(map: &SolidMap) -> Vec<(usize, usize, usize)> {
    let mut out: Vec<(usize, usize, usize)> = Vec::new();
    for (x, y) in map.solid_cells() {
        match out.last_mut() {
            Some((ry, rx, len)) if *ry == y && *rx + *len == x => *len += 1,
            _ => out.push((y, x, 1)),
        }
    }
    out
}
