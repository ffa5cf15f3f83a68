/// Slot of a particle inside a [`crate::particles::ParticleStore`].
///
/// Only meaningful while it is below the store's active count; a recycle
/// may move a different particle into the same slot.
pub type ParticleIndex = usize;

/// Stable identifier of a [`crate::well::GravityWell`].
///
/// Unlike positions in `WellSet::wells`, ids survive pruning of dead wells
/// and are never reused within one simulation.
pub type WellId = u32;
