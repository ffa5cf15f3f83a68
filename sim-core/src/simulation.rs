//! The simulation aggregate and its tick entry point.
//!
//! [`Simulation`] owns the particle pool, the wells, the spawn queue and the
//! random source. Hosts drive it by calling [`Simulation::step`] once per
//! frame and read the committed state through shared borrows between steps;
//! the borrow checker rules out reading while a step is in flight.

use crate::{
    config::SimConfig,
    error::SimError,
    particles::{ParticleStore, Segment},
    phases,
    rng::{SimRng, seeded},
    spawn_queue::SpawnQueue,
    types::{ParticleIndex, WellId},
    well::WellSet,
};
use glam::Vec2;

/// What happened during one call to [`Simulation::step`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Particles absorbed by wells.
    pub absorbed: usize,
    /// Particles recycled by the boundary policy.
    pub culled: usize,
    pub spawned: usize,
    /// Drained spawn requests dropped because the pool was full.
    pub dropped: usize,
    /// Spawn requests rejected by a full queue since the previous tick.
    pub rejected: usize,
    /// Consumers that died this tick.
    pub died: Vec<WellId>,
    /// A fresh well set was seeded at the start of this tick.
    pub reseeded: bool,
}

#[derive(Debug)]
pub struct Simulation {
    cfg: SimConfig,
    particles: ParticleStore,
    wells: WellSet,
    queue: SpawnQueue,
    rng: SimRng,
    anchor_home: Vec2,
    rejected: usize,
    tick: u64,
}

impl Simulation {
    /// Builds a simulation with a seeded Anchor and `consumer_count` Consumers.
    ///
    /// ### Returns
    /// `Err(SimError::InvalidConfig)` if `cfg` fails [`SimConfig::validate`].
    pub fn new(cfg: SimConfig) -> Result<Self, SimError> {
        let mut rng = checked_rng(&cfg)?;
        let wells = WellSet::seeded(&cfg, &mut rng);
        Ok(Self::assemble(cfg, wells, rng))
    }

    /// Builds a simulation around a caller-provided well set.
    ///
    /// The Anchor's home point (used by [`Self::toggle_anchor_target`] and
    /// re-seeding) is the first live Anchor's position, or the viewport
    /// centre if there is none.
    pub fn with_wells(cfg: SimConfig, wells: WellSet) -> Result<Self, SimError> {
        let rng = checked_rng(&cfg)?;
        Ok(Self::assemble(cfg, wells, rng))
    }

    fn assemble(cfg: SimConfig, wells: WellSet, rng: SimRng) -> Self {
        let anchor_home = wells.anchor().map_or(cfg.viewport * 0.5, |a| a.pos);
        Self {
            particles: ParticleStore::with_capacity(cfg.max_particles),
            queue: SpawnQueue::with_capacity(cfg.spawn_queue_capacity),
            wells,
            rng,
            anchor_home,
            rejected: 0,
            tick: 0,
            cfg,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    pub fn wells(&self) -> &WellSet {
        &self.wells
    }

    /// Motion segments of all live particles, for trail rendering.
    pub fn segments(&self) -> impl ExactSizeIterator<Item = Segment> + '_ {
        self.particles.segments()
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn pending_spawns(&self) -> usize {
        self.queue.len()
    }

    pub fn anchor_home(&self) -> Vec2 {
        self.anchor_home
    }

    /// Queues a spawn at `pos`, to be applied during the next tick.
    ///
    /// ### Returns
    /// `false` if the queue is full and the request was dropped.
    pub fn request_spawn(&mut self, pos: Vec2) -> bool {
        match self.queue.push(pos) {
            Ok(()) => true,
            Err(_) => {
                self.rejected += 1;
                false
            }
        }
    }

    /// Spawns a particle immediately, bypassing the queue and the rate limit.
    pub fn spawn(&mut self, pos: Vec2) -> Result<ParticleIndex, SimError> {
        self.particles.spawn(
            pos,
            self.cfg.spawn_jitter,
            self.cfg.spawn_velocity_jitter,
            &mut self.rng,
        )
    }

    /// Recycles the particle at `index`. See [`ParticleStore::recycle`].
    pub fn recycle(&mut self, index: ParticleIndex) -> bool {
        self.particles.recycle(index)
    }

    /// Moves the Anchor to `target`, or back to its home point if it is
    /// already away from home. The Anchor is left at rest.
    ///
    /// ### Returns
    /// The Anchor's new position, or `None` if there is no live Anchor.
    pub fn toggle_anchor_target(&mut self, target: Vec2) -> Option<Vec2> {
        let home = self.anchor_home;
        let anchor = self.wells.anchor_mut()?;
        anchor.pos = if anchor.pos == home { target } else { home };
        anchor.vel = Vec2::ZERO;
        Some(anchor.pos)
    }

    /// Advances the simulation by one tick.
    ///
    /// `dt` is elapsed time in 60 Hz frame units; it is clamped to
    /// `[0, max_dt]`, and a non-finite `dt` counts as zero.
    ///
    /// Order within a tick:
    /// 1. Re-seed the wells if none are alive, or if Consumers are configured
    ///    and all of them have died.
    /// 2. [`phases::absorption_phase`], one well at a time.
    /// 3. [`phases::boundary_phase`].
    /// 4. [`phases::well_dynamics_phase`].
    /// 5. [`phases::integration_phase`].
    /// 6. [`phases::trail_capture_phase`] on the segments just travelled.
    /// 7. [`phases::spawn_phase`].
    pub fn step(&mut self, dt: f32) -> TickReport {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.cfg.max_dt)
        } else {
            0.0
        };

        let reseeded = self.ensure_wells();
        let mut absorbed =
            phases::absorption_phase(&mut self.particles, &mut self.wells, &self.cfg, dt);
        let culled = phases::boundary_phase(&mut self.particles, &self.wells, &self.cfg);
        let died = phases::well_dynamics_phase(&mut self.wells, &self.cfg, dt);
        phases::integration_phase(&mut self.particles, dt);
        absorbed += phases::trail_capture_phase(&mut self.particles, &mut self.wells, &self.cfg);
        let counts =
            phases::spawn_phase(&mut self.particles, &mut self.queue, &self.cfg, &mut self.rng);

        let rejected = std::mem::take(&mut self.rejected);
        if rejected > 0 {
            log::debug!(
                "spawn queue full ({}), rejected {} requests",
                self.queue.capacity(),
                rejected
            );
        }

        self.tick += 1;
        TickReport {
            absorbed,
            culled,
            spawned: counts.spawned,
            dropped: counts.dropped,
            rejected,
            died,
            reseeded,
        }
    }

    fn ensure_wells(&mut self) -> bool {
        let none_alive = self.wells.alive_count() == 0;
        let consumers_gone = self.cfg.consumer_count > 0 && self.wells.alive_consumers() == 0;
        if !none_alive && !consumers_gone {
            return false;
        }

        let pruned = self.wells.prune_dead();
        if self.wells.anchor().is_none() {
            self.wells.add_anchor(self.anchor_home, &self.cfg);
        }
        self.wells.seed_consumers(&self.cfg, &mut self.rng);
        log::info!(
            "re-seeded wells at tick {}: pruned {}, now {} alive",
            self.tick,
            pruned,
            self.wells.alive_count()
        );
        true
    }

    /// Drops every particle and pending spawn request.
    pub fn clear_particles(&mut self) {
        self.particles.clear();
        self.queue.clear();
    }

    /// Clears all particles and replaces the wells with a freshly seeded set.
    pub fn reset(&mut self) {
        self.clear_particles();
        self.anchor_home = self.cfg.viewport * 0.5;
        self.wells = WellSet::seeded(&self.cfg, &mut self.rng);
        self.rejected = 0;
        self.tick = 0;
    }

    /// Replaces the configuration between ticks.
    ///
    /// Live wells pick up the new base forces. If the pool or queue capacity
    /// changed, the corresponding storage is rebuilt empty; everything else
    /// keeps its state.
    ///
    /// ### Returns
    /// `Err(SimError::InvalidConfig)` and no change if `cfg` is invalid.
    pub fn update_config(&mut self, cfg: SimConfig) -> Result<(), SimError> {
        cfg.validate()?;
        if cfg.max_particles != self.cfg.max_particles {
            self.particles = ParticleStore::with_capacity(cfg.max_particles);
        }
        if cfg.spawn_queue_capacity != self.cfg.spawn_queue_capacity {
            self.queue = SpawnQueue::with_capacity(cfg.spawn_queue_capacity);
        }
        for w in self.wells.wells.iter_mut().filter(|w| w.is_alive()) {
            w.base_force = if w.is_anchor() {
                cfg.anchor_force()
            } else {
                cfg.base_force
            };
        }
        self.cfg = cfg;
        Ok(())
    }
}

fn checked_rng(cfg: &SimConfig) -> Result<SimRng, SimError> {
    if let Err(e) = cfg.validate() {
        log::warn!("refusing to build simulation: {e}");
        return Err(e);
    }
    Ok(seeded(cfg.seed))
}
