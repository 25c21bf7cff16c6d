//! World-space points and distance helpers.

use glam::Vec2;

/// Position in world coordinates (pixels, y grows downward).
pub type WorldPoint = Vec2;

/// Squared distance between two world points.
#[must_use]
pub fn distance_sq(a: WorldPoint, b: WorldPoint) -> f32 {
    a.distance_squared(b)
}

/// Converts an attack range into the squared form used by range checks.
///
/// Negative ranges collapse to zero so they can never select anything but a
/// candidate standing exactly on the origin.
#[must_use]
pub fn range_sq(range: f32) -> f32 {
    let range = range.max(0.0);
    range * range
}

/// Returns true if `point` lies within `range` of `origin` (inclusive).
#[must_use]
pub fn within_range(origin: WorldPoint, point: WorldPoint, range: f32) -> bool {
    distance_sq(origin, point) <= range_sq(range)
}
