//! Force and absorption model between particles and wells, and between wells.
//!
//! All functions are pure. Degenerate geometry (zero-length motion, a
//! particle sitting on a well) is resolved here and never reported upward.

use crate::{config::SimConfig, well::GravityWell};
use glam::Vec2;

/// Attraction of a particle at `particle` toward a well at `well`.
///
/// Magnitude is `base_force * mass * 100 / dist_sq`, directed from the
/// particle to the well. `dist_sq` is floored at `floor * floor`, and a
/// particle exactly on the well feels no force since there is no direction.
///
/// ### Returns
/// A finite force vector.
pub fn attraction(particle: Vec2, well: Vec2, mass: f32, base_force: f32, floor: f32) -> Vec2 {
    let d = well - particle;
    let dist_sq = d.length_squared().max(floor * floor);
    let magnitude = base_force * mass * 100.0 / dist_sq;
    d.normalize_or_zero() * magnitude
}

/// `true` iff the particle lies inside or on the absorption circle.
#[inline]
pub fn is_absorbed(dist_sq: f32, min_range_sq: f32) -> bool {
    dist_sq <= min_range_sq
}

/// Whether the segment `p1 → p2` touches the circle of squared radius
/// `range_sq` around `center`.
///
/// Solves `a·t² + b·t + c = 0` for the parametrised segment
/// `p1 + t·(p2 - p1)`. The segment hits the circle when the discriminant is
/// non-negative and the root interval `[t0, t1]` overlaps `[0, 1]`. A
/// zero-length segment never intersects.
pub fn swept_absorbed(p1: Vec2, p2: Vec2, center: Vec2, range_sq: f32) -> bool {
    let d = p2 - p1;
    let a = d.length_squared();
    if a == 0.0 {
        return false;
    }
    let f = p1 - center;
    let b = 2.0 * d.dot(f);
    let c = f.length_squared() - range_sq;

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return false;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = (-b - sqrt_disc) / (2.0 * a);
    let t1 = (-b + sqrt_disc) / (2.0 * a);
    t0 <= 1.0 && t1 >= 0.0
}

/// Outcome of one well acting on another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WellPull {
    /// Velocity change for the acted-on well, before `dt` scaling.
    pub impulse: Vec2,
    /// The acted-on Consumer left the acting Anchor's reach.
    pub escaped: bool,
}

/// Pull of `source` on the Consumer `target`.
///
/// Distance is floored at `source.min_range_sq`.
/// - Anchor on Consumer: magnitude
///   `base_s * mass_s * mass_t * base_t / (max(1, |preferred_orbit - dist|) * orbit_scale)`
///   with the per-unit scale capped at `max_center_force`; `escaped` is set
///   when `dist > escape_distance`.
/// - Consumer on Consumer: inverse square, `base_s * base_t * mass_s * mass_t / dist_sq`.
pub fn well_interaction(source: &GravityWell, target: &GravityWell, cfg: &SimConfig) -> WellPull {
    let d = source.pos - target.pos;
    let dist_sq = d.length_squared().max(source.min_range_sq);
    let dist = dist_sq.sqrt();

    if source.is_anchor() {
        let masses = source.total_mass * target.total_mass;
        let magnitude = source.base_force * target.base_force * masses
            / ((cfg.preferred_orbit - dist).abs().max(1.0) * cfg.orbit_scale);
        let scale = (magnitude / dist).min(cfg.max_center_force);
        WellPull {
            impulse: d * scale,
            escaped: dist > cfg.escape_distance,
        }
    } else {
        let magnitude =
            source.base_force * target.base_force * source.total_mass * target.total_mass / dist_sq;
        WellPull {
            impulse: d * (magnitude / dist),
            escaped: false,
        }
    }
}
