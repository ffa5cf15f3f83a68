//! Configuration surface of the simulation.
//!
//! Everything here is a plain constant: a simulation is fully rebuilt from a
//! [`SimConfig`] and nothing in it changes while ticks run, except through
//! the explicit setters a host may choose to call between ticks.

use crate::error::SimError;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Region outside of which a particle is recycled without reaching a well.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Boundary {
    /// Particles are never culled.
    None,
    /// Particles at or beyond `radius` from the first live Anchor are culled.
    AnchorRadius { radius: f32 },
    /// Particles outside `[-margin, 1 + margin]` of each viewport axis
    /// (as a fraction of the viewport size) are culled.
    Viewport { margin: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Size of the world the wells are seeded into; the Anchor starts at its centre.
    pub viewport: Vec2,
    pub max_particles: usize,
    /// Per-component velocity clamp for particles.
    pub max_speed: f32,
    /// Spawn requests drained from the queue per tick.
    pub spawn_rate: usize,
    pub spawn_queue_capacity: usize,
    /// Half-width of the uniform position jitter applied on spawn.
    pub spawn_jitter: f32,
    /// Half-width of the uniform velocity jitter applied on spawn.
    pub spawn_velocity_jitter: f32,

    pub base_min_range: f32,
    pub mass_increment: f32,
    pub base_force: f32,
    /// The Anchor's base force is `base_force * anchor_force_multiplier`.
    pub anchor_force_multiplier: f32,

    pub consumer_count: usize,
    /// Per-component velocity clamp for wells.
    pub well_max_speed: f32,
    /// Cap on the Anchor's pull scale on a Consumer.
    pub max_center_force: f32,
    pub consumer_velocity_jitter: f32,
    /// Distance from the Anchor at which Consumers feel the strongest pull.
    pub preferred_orbit: f32,
    pub orbit_scale: f32,
    /// Consumers farther than this from an Anchor die.
    pub escape_distance: f32,

    /// Whether the Anchor attracts and absorbs particles itself.
    pub anchor_captures: bool,
    pub boundary: Boundary,

    /// Largest frame-normalised `dt` accepted by a single step.
    pub max_dt: f32,
    /// Minimum particle-to-well distance used in force computation.
    pub singularity_floor: f32,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            viewport: Vec2::new(1600.0, 900.0),
            max_particles: 200_000,
            max_speed: 15.0,
            spawn_rate: 100,
            spawn_queue_capacity: 4096,
            spawn_jitter: 2.0,
            spawn_velocity_jitter: 2.0,
            base_min_range: 15.0,
            mass_increment: 0.0002,
            base_force: 5.0,
            anchor_force_multiplier: 5.0,
            consumer_count: 3,
            well_max_speed: 10.0,
            max_center_force: 1.0,
            consumer_velocity_jitter: 0.25,
            preferred_orbit: 800.0,
            orbit_scale: 1500.0,
            escape_distance: 1500.0,
            anchor_captures: false,
            boundary: Boundary::AnchorRadius { radius: 1000.0 },
            max_dt: 2.0,
            singularity_floor: 0.01,
            seed: None,
        }
    }
}

impl SimConfig {
    /// One non-capturing Anchor orbited by devouring Consumers.
    pub fn multi_well() -> Self {
        Self::default()
    }

    /// A single fixed well that pulls and absorbs particles itself.
    pub fn single_well() -> Self {
        Self {
            consumer_count: 0,
            anchor_captures: true,
            boundary: Boundary::Viewport { margin: 0.2 },
            ..Self::default()
        }
    }

    /// Anchor base force derived from the shared base force.
    #[inline]
    pub fn anchor_force(&self) -> f32 {
        self.base_force * self.anchor_force_multiplier
    }

    /// Checks that the configuration can be simulated.
    ///
    /// ### Returns
    /// - `Ok(())` if every value is finite and inside its usable range.
    /// - `Err(SimError::InvalidConfig)` naming the first offending field.
    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |msg: &str| Err(SimError::InvalidConfig(msg.to_owned()));

        if self.max_particles == 0 {
            return invalid("max_particles must be non-zero");
        }
        if self.spawn_queue_capacity == 0 {
            return invalid("spawn_queue_capacity must be non-zero");
        }
        if !self.viewport.is_finite() || self.viewport.x <= 0.0 || self.viewport.y <= 0.0 {
            return invalid("viewport must be positive and finite");
        }

        let non_negative = [
            ("max_speed", self.max_speed),
            ("spawn_jitter", self.spawn_jitter),
            ("spawn_velocity_jitter", self.spawn_velocity_jitter),
            ("mass_increment", self.mass_increment),
            ("base_force", self.base_force),
            ("anchor_force_multiplier", self.anchor_force_multiplier),
            ("well_max_speed", self.well_max_speed),
            ("max_center_force", self.max_center_force),
            ("consumer_velocity_jitter", self.consumer_velocity_jitter),
            ("preferred_orbit", self.preferred_orbit),
            ("max_dt", self.max_dt),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        let positive = [
            ("base_min_range", self.base_min_range),
            ("orbit_scale", self.orbit_scale),
            ("escape_distance", self.escape_distance),
            ("singularity_floor", self.singularity_floor),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }

        match self.boundary {
            Boundary::AnchorRadius { radius } if !(radius.is_finite() && radius > 0.0) => {
                invalid("boundary radius must be finite and positive")
            }
            Boundary::Viewport { margin } if !(margin.is_finite() && margin >= 0.0) => {
                invalid("boundary margin must be finite and non-negative")
            }
            _ => Ok(()),
        }
    }
}
