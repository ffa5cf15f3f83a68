//! Core gravity-well particle simulation library.
//!
//! Main components:
//! - [`particles`] — fixed-capacity particle pool with swap-remove recycling.
//! - [`well`] — Anchor and Consumer gravity wells and the well set.
//! - [`forces`] — attraction, absorption and well-to-well force model.
//! - [`spawn_queue`] — bounded queue of spawn requests from the input layer.
//! - [`phases`] — the per-tick passes.
//! - [`simulation`] — the owned simulation state and its `step` entry point.
//! - [`config`] — configuration surface and presets.
//! - [`error`] — error taxonomy.
//! - [`rng`] — seedable random source.
//! - [`types`] — shared index and id aliases.

pub mod config;
pub mod error;
pub mod forces;
pub mod particles;
pub mod phases;
pub mod rng;
pub mod simulation;
pub mod spawn_queue;
pub mod types;
pub mod well;

pub use config::{Boundary, SimConfig};
pub use error::SimError;
pub use simulation::{Simulation, TickReport};
