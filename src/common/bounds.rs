//! Axis-aligned boxes for hit detection.

use bevy::prelude::*;

/// World-space box described by centre and half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec2,
    pub half: Vec2,
}

impl Aabb {
    #[inline]
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self { center, half: size * 0.5 }
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.center - self.half
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.center + self.half
    }

    /// Inclusive overlap: boxes that only touch along an edge count as overlapping.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let (a0, a1) = (self.min(), self.max());
        let (b0, b1) = (other.min(), other.max());
        a0.x <= b1.x && b0.x <= a1.x && a0.y <= b1.y && b0.y <= a1.y
    }
}

/// Body extents used when something asks "where is this entity".
#[derive(Component, Debug, Clone, Copy)]
pub struct Hurtbox {
    pub half: Vec2,
}

impl Hurtbox {
    pub fn from_size(w: f32, h: f32) -> Self {
        Self { half: Vec2::new(w * 0.5, h * 0.5) }
    }

    #[inline]
    pub fn at(&self, pos: Vec2) -> Aabb {
        Aabb { center: pos, half: self.half }
    }
}
