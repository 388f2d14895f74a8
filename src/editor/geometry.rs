//! World-space geometry for drawing nodes and connections

use eframe::egui::{Pos2, Vec2};
use std::f32::consts::{PI, TAU};

/// Node circle radius in world units
pub const NODE_RADIUS: f32 = 40.0;

/// Length of each arrowhead stroke in world units
pub const ARROW_LENGTH: f32 = 12.0;

/// Angle between the line and each arrowhead stroke (30°)
pub const ARROW_SPREAD: f32 = PI / 6.0;

/// Radius of the label chip drawn at a connection midpoint
pub const LABEL_CHIP_RADIUS: f32 = 14.0;

pub fn midpoint(a: Pos2, b: Pos2) -> Pos2 {
    Pos2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Point where the segment `from → to` enters a circle of `radius` around `to`.
///
/// Falls back to `to` when the points coincide.
pub fn arrow_tip(from: Pos2, to: Pos2, radius: f32) -> Pos2 {
    let dir = to - from;
    let len = dir.length();
    if len <= f32::EPSILON || radius >= len {
        return to;
    }
    to - dir / len * radius
}

/// The two chevron stroke ends of an arrowhead pointing at `tip`,
/// travelling along `from → tip`.
pub fn arrow_chevron(from: Pos2, tip: Pos2, length: f32, spread: f32) -> [Pos2; 2] {
    let dir = tip - from;
    let angle = dir.y.atan2(dir.x);
    let back = |theta: f32| tip - Vec2::new(theta.cos(), theta.sin()) * length;
    [back(angle - spread), back(angle + spread)]
}

/// Evenly spaced positions on a circle, starting at 12 o'clock
pub fn ring_layout(center: Pos2, radius: f32, count: usize) -> Vec<Pos2> {
    if count == 1 {
        return vec![center];
    }
    (0..count)
        .map(|i| {
            let theta = TAU * i as f32 / count as f32 - PI / 2.0;
            center + Vec2::new(theta.cos(), theta.sin()) * radius
        })
        .collect()
}

/// Centroid of a set of points, or the origin when empty
pub fn centroid(points: impl IntoIterator<Item = Pos2>) -> Pos2 {
    let (sum, n) = points
        .into_iter()
        .fold((Vec2::ZERO, 0usize), |(sum, n), p| (sum + p.to_vec2(), n + 1));
    if n == 0 {
        Pos2::ZERO
    } else {
        (sum / n as f32).to_pos2()
    }
}
