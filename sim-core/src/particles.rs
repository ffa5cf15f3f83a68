//! Fixed-capacity particle pool.
//!
//! Particles live in parallel arrays (structure of arrays). Slots
//! `[0, len)` are live; everything past `len` is stale and gets overwritten
//! before reuse. Removal is a swap-remove, so the live region always stays
//! a contiguous prefix and no per-slot alive flag is needed.

use crate::{error::SimError, types::ParticleIndex};
use glam::Vec2;
use rand::Rng;

/// One line segment of a particle's motion during the last tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub prev: Vec2,
    pub pos: Vec2,
}

#[derive(Debug)]
pub struct ParticleStore {
    pos: Vec<Vec2>,
    prev: Vec<Vec2>,
    vel: Vec<Vec2>,
    len: usize,
}

impl ParticleStore {
    /// Allocates every slot up front; the pool never grows afterwards.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pos: vec![Vec2::ZERO; capacity],
            prev: vec![Vec2::ZERO; capacity],
            vel: vec![Vec2::ZERO; capacity],
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.pos.len()
    }

    /// Number of live particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends a particle with exact state at slot `len`.
    ///
    /// `prev` is set equal to `pos`, so a freshly inserted particle draws as
    /// a zero-length segment until it moves.
    ///
    /// ### Returns
    /// - The slot of the new particle.
    /// - `Err(SimError::PoolExhausted)` if every slot is live.
    pub fn insert(&mut self, pos: Vec2, vel: Vec2) -> Result<ParticleIndex, SimError> {
        if self.is_full() {
            return Err(SimError::PoolExhausted {
                capacity: self.capacity(),
            });
        }
        let i = self.len;
        self.pos[i] = pos;
        self.prev[i] = pos;
        self.vel[i] = vel;
        self.len += 1;
        Ok(i)
    }

    /// Spawns a particle near `origin`.
    ///
    /// Position is offset by a uniform jitter in `[-pos_jitter, pos_jitter]`
    /// per axis, and the initial velocity is drawn uniformly from
    /// `[-vel_jitter, vel_jitter]` per axis.
    ///
    /// ### Returns
    /// The slot of the new particle, or `Err(SimError::PoolExhausted)`.
    pub fn spawn(
        &mut self,
        origin: Vec2,
        pos_jitter: f32,
        vel_jitter: f32,
        rng: &mut impl Rng,
    ) -> Result<ParticleIndex, SimError> {
        if self.is_full() {
            return Err(SimError::PoolExhausted {
                capacity: self.capacity(),
            });
        }
        let pos = origin + jitter(pos_jitter, rng);
        let vel = jitter(vel_jitter, rng);
        self.insert(pos, vel)
    }

    /// Removes the particle at `index` by moving the last live particle into
    /// its slot.
    ///
    /// Any index previously held for the last live particle is invalidated,
    /// and the particle now at `index` has not been visited by a forward scan
    /// that is currently at `index`: such a scan must retry the same slot.
    ///
    /// ### Returns
    /// `false` (and does nothing) if `index` is not a live slot.
    pub fn recycle(&mut self, index: ParticleIndex) -> bool {
        if index >= self.len {
            log::debug!("ignoring recycle of dead slot {index} ({} live)", self.len);
            return false;
        }
        self.len -= 1;
        let last = self.len;
        if index != last {
            self.pos[index] = self.pos[last];
            self.prev[index] = self.prev[last];
            self.vel[index] = self.vel[last];
        }
        true
    }

    /// Drops every live particle.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn pos(&self, i: ParticleIndex) -> Vec2 {
        self.pos[..self.len][i]
    }

    #[inline]
    pub fn prev(&self, i: ParticleIndex) -> Vec2 {
        self.prev[..self.len][i]
    }

    #[inline]
    pub fn vel(&self, i: ParticleIndex) -> Vec2 {
        self.vel[..self.len][i]
    }

    #[inline]
    pub(crate) fn set_vel(&mut self, i: ParticleIndex, vel: Vec2) {
        self.vel[..self.len][i] = vel;
    }

    /// Live positions.
    pub fn positions(&self) -> &[Vec2] {
        &self.pos[..self.len]
    }

    /// Live positions at the start of the last tick.
    pub fn prev_positions(&self) -> &[Vec2] {
        &self.prev[..self.len]
    }

    /// Iterates the motion segment `(prev, pos)` of every live particle.
    pub fn segments(&self) -> impl ExactSizeIterator<Item = Segment> + '_ {
        self.prev_positions()
            .iter()
            .zip(self.positions())
            .map(|(&prev, &pos)| Segment { prev, pos })
    }

    /// Moves every live particle by `vel * dt`, remembering where it started.
    pub(crate) fn integrate(&mut self, dt: f32) {
        let n = self.len;
        for ((pos, prev), vel) in self.pos[..n]
            .iter_mut()
            .zip(&mut self.prev[..n])
            .zip(&self.vel[..n])
        {
            *prev = *pos;
            *pos += *vel * dt;
        }
    }
}

fn jitter(half_width: f32, rng: &mut impl Rng) -> Vec2 {
    if half_width <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        rng.random_range(-half_width..=half_width),
        rng.random_range(-half_width..=half_width),
    )
}
