//! Force laws shared by the passes
//!
//! Each function computes the force on a single node; the passes sum them.
//! Near-coincident positions contribute nothing instead of producing an
//! unstable direction.

use glam::Vec3;

/// Inverse-square repulsion on `a` from `b`.
///
/// Points away from `b` with magnitude `scale * k² / |b - a|²`. Pairs closer
/// than `sqrt(epsilon)` (including a node against itself) contribute zero.
pub fn repel(a: Vec3, b: Vec3, k: f32, scale: f32, epsilon: f32) -> Vec3 {
    let d = b - a;
    let dist_sq = d.length_squared();
    if dist_sq < epsilon {
        return Vec3::ZERO;
    }
    -d.normalize() * (scale * k * k / dist_sq)
}

/// Linear spring pulling `a` toward the origin
pub fn center(a: Vec3, strength: f32) -> Vec3 {
    -a.normalize_or_zero() * a.length() * strength
}

/// Hooke spring pulling `a` toward `b`.
///
/// Magnitude is `|b - a| * stiffness`; endpoints closer than `epsilon`
/// contribute zero.
pub fn spring(a: Vec3, b: Vec3, stiffness: f32, epsilon: f32) -> Vec3 {
    let d = a - b;
    let dist = d.length();
    if dist < epsilon {
        return Vec3::ZERO;
    }
    -(d / dist) * dist * stiffness
}
