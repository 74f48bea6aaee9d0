//! The Position Solver - absolute 2-D positions on nested circular orbits.
//!
//! A body's position is its parent's position plus a circular offset:
//!
//! ```text
//! angle = (t / period) * 360° * direction + phase
//! x = parent.x + R * cos(angle)
//! y = parent.y + R * sin(angle)
//! ```
//!
//! The root body sits at the origin for every `t`.

use crate::registry::{Body, BodyRegistry, RegistryError};
use crate::BodyId;
use nalgebra::{Point2, Vector2};
use std::collections::BTreeMap;

/// Absolute position in meters.
pub type Position = Point2<f64>;

/// Positions of every body at one instant, keyed by id.
pub type PositionMap = BTreeMap<BodyId, Position>;

/// Orbital angle of `body` at time `t`, in radians.
pub fn orbital_angle(body: &Body, t: f64) -> f64 {
    let degrees = (t / body.orbital_period) * 360.0 * body.direction.sign() + body.phase_deg;
    degrees.to_radians()
}

/// Offset of `body` from its parent's center at time `t`.
///
/// Zero for the root.
pub fn orbital_offset(body: &Body, t: f64) -> Vector2<f64> {
    if body.is_root() {
        return Vector2::zeros();
    }
    let angle = orbital_angle(body, t);
    Vector2::new(body.orbital_radius * angle.cos(), body.orbital_radius * angle.sin())
}

/// Resolves the absolute position of a single body at time `t`.
///
/// Walks the ancestor chain from the root downwards, so the arithmetic is
/// identical to [`resolve_all`] and both agree bit for bit.
///
/// # Errors
/// [`RegistryError::UnknownBody`] if `id` is not in the registry.
pub fn resolve(registry: &BodyRegistry, id: BodyId, t: f64) -> Result<Position, RegistryError> {
    let mut position = Position::origin();
    for body in registry.lineage(id)? {
        position += orbital_offset(body, t);
    }
    Ok(position)
}

/// Resolves every body at time `t`.
///
/// Bodies are visited in breadth-first order so each parent is resolved
/// exactly once and reused by all of its children.
pub fn resolve_all(registry: &BodyRegistry, t: f64) -> PositionMap {
    let mut positions = PositionMap::new();
    for body in registry.evaluation_order() {
        let base = match body.parent {
            Some(parent) => positions[&parent],
            None => Position::origin(),
        };
        positions.insert(body.id, base + orbital_offset(body, t));
    }
    positions
}
