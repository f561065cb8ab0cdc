//! Placement of the captured frame inside the source rectangle.
//!
//! The frame is laid out on the host's base canvas first (native size,
//! aspect-fit stretch, or full stretch), centered, and then scaled into the
//! rectangle the host is rendering the source into.

use std::ops::{Add, Div, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn round(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x * rhs.x, self.y * rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x / rhs.x, self.y / rhs.y)
    }
}

/// How the frame is scaled onto the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fit {
    pub stretch: bool,
    pub ignore_aspect: bool,
}

/// Where to draw the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Top-left corner, rounded to whole pixels.
    pub origin: Vec2,
    pub size: Vec2,
    /// Draw bottom-up (the agent captured an upside-down surface).
    pub flip: bool,
}

impl Placement {
    /// Start and end corners for a sprite draw, with the flip applied.
    pub fn corners(&self) -> (Vec2, Vec2) {
        let end = self.origin + self.size;
        if self.flip {
            (
                Vec2::new(self.origin.x, end.y),
                Vec2::new(end.x, self.origin.y),
            )
        } else {
            (self.origin, end)
        }
    }
}

/// Lays out a `texture`-sized frame on a `canvas`, then maps it into the
/// rectangle at `pos` with size `size`.
///
/// Returns `None` for degenerate texture or canvas sizes.
pub fn place(
    texture: Vec2,
    canvas: Vec2,
    pos: Vec2,
    size: Vec2,
    fit: Fit,
    flip: bool,
) -> Option<Placement> {
    if texture.x <= 0.0 || texture.y <= 0.0 || canvas.x <= 0.0 || canvas.y <= 0.0 {
        return None;
    }

    let center = canvas * 0.5;
    let (mut origin, mut extent) = if fit.stretch && fit.ignore_aspect {
        (Vec2::default(), canvas)
    } else {
        let extent = if fit.stretch {
            let x_aspect = canvas.x / texture.x;
            let y_aspect = canvas.y / texture.y;
            let scale = if texture.y * x_aspect > canvas.y {
                y_aspect
            } else {
                x_aspect
            };
            texture * scale
        } else {
            texture
        };
        (center - extent * 0.5, extent)
    };

    let adjust = size / canvas;
    origin = origin * adjust + pos;
    extent = extent * adjust;

    Some(Placement {
        origin: origin.round(),
        size: extent,
        flip,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
