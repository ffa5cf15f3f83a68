use crate::{config::SimConfig, types::WellId};
use glam::Vec2;
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WellKind {
    /// Central well that never dies and holds Consumers near an orbit.
    Anchor,
    /// Mobile well that devours particles and dies if it strays too far.
    Consumer,
}

#[derive(Clone, Debug)]
pub struct GravityWell {
    pub id: WellId,
    pub kind: WellKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub base_force: f32,
    /// Starts at 1 and only grows, by the mass increment per absorption.
    pub total_mass: f32,
    /// Particles absorbed over the well's lifetime.
    pub absorbed: u64,
    pub min_range: f32,
    pub min_range_sq: f32,
    pub dead: bool,
}

impl GravityWell {
    pub fn new(
        id: WellId,
        kind: WellKind,
        pos: Vec2,
        vel: Vec2,
        base_force: f32,
        base_min_range: f32,
    ) -> Self {
        Self {
            id,
            kind,
            pos,
            vel,
            base_force,
            total_mass: 1.0,
            absorbed: 0,
            min_range: base_min_range,
            min_range_sq: base_min_range * base_min_range,
            dead: false,
        }
    }

    #[inline]
    pub fn is_anchor(&self) -> bool {
        self.kind == WellKind::Anchor
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Recomputes the absorption radius from the accumulated mass.
    ///
    /// `min_range = base_min_range * (1 + log10(total_mass) / 3)`, so the
    /// radius grows sub-linearly with absorbed mass.
    pub fn refresh_range(&mut self, base_min_range: f32) {
        self.min_range = base_min_range * (1.0 + self.total_mass.log10() / 3.0);
        self.min_range_sq = self.min_range * self.min_range;
    }

    /// Credits one absorbed particle to this well.
    pub fn absorb(&mut self, mass_increment: f32) {
        self.total_mass += mass_increment;
        self.absorbed += 1;
    }

    /// Terminal transition; Anchors ignore it.
    pub fn kill(&mut self) -> bool {
        if self.is_anchor() || self.dead {
            return false;
        }
        self.dead = true;
        true
    }
}

#[derive(Debug, Default)]
pub struct WellSet {
    pub wells: Vec<GravityWell>,
    next_id: WellId,
}

impl WellSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a well and returns the id assigned to it.
    pub fn push(&mut self, mut well: GravityWell) -> WellId {
        let id = self.next_id;
        self.next_id += 1;
        well.id = id;
        self.wells.push(well);
        id
    }

    pub fn add_anchor(&mut self, pos: Vec2, cfg: &SimConfig) -> WellId {
        self.push(GravityWell::new(
            0,
            WellKind::Anchor,
            pos,
            Vec2::ZERO,
            cfg.anchor_force(),
            cfg.base_min_range,
        ))
    }

    pub fn add_consumer(&mut self, pos: Vec2, vel: Vec2, cfg: &SimConfig) -> WellId {
        self.push(GravityWell::new(
            0,
            WellKind::Consumer,
            pos,
            vel,
            cfg.base_force,
            cfg.base_min_range,
        ))
    }

    /// Adds `cfg.consumer_count` Consumers at uniform random points of the
    /// viewport with a small random drift.
    pub fn seed_consumers(&mut self, cfg: &SimConfig, rng: &mut impl Rng) {
        let j = cfg.consumer_velocity_jitter;
        for _ in 0..cfg.consumer_count {
            let pos = Vec2::new(
                rng.random_range(0.0..=cfg.viewport.x),
                rng.random_range(0.0..=cfg.viewport.y),
            );
            let vel = if j > 0.0 {
                Vec2::new(rng.random_range(-j..=j), rng.random_range(-j..=j))
            } else {
                Vec2::ZERO
            };
            self.add_consumer(pos, vel, cfg);
        }
    }

    /// A fresh Anchor at the viewport centre plus the configured Consumers.
    pub fn seeded(cfg: &SimConfig, rng: &mut impl Rng) -> Self {
        let mut set = Self::new();
        set.add_anchor(cfg.viewport * 0.5, cfg);
        set.seed_consumers(cfg, rng);
        set
    }

    pub fn get(&self, id: WellId) -> Option<&GravityWell> {
        self.wells.iter().find(|w| w.id == id)
    }

    pub fn get_mut(&mut self, id: WellId) -> Option<&mut GravityWell> {
        self.wells.iter_mut().find(|w| w.id == id)
    }

    pub fn anchor(&self) -> Option<&GravityWell> {
        self.wells.iter().find(|w| w.is_anchor() && w.is_alive())
    }

    pub fn anchor_mut(&mut self) -> Option<&mut GravityWell> {
        self.wells.iter_mut().find(|w| w.is_anchor() && w.is_alive())
    }

    pub fn alive(&self) -> impl Iterator<Item = &GravityWell> {
        self.wells.iter().filter(|w| w.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    pub fn alive_consumers(&self) -> usize {
        self.alive().filter(|w| !w.is_anchor()).count()
    }

    /// Drops dead wells from the set. Ids of surviving wells are unchanged.
    pub fn prune_dead(&mut self) -> usize {
        let before = self.wells.len();
        self.wells.retain(GravityWell::is_alive);
        before - self.wells.len()
    }
}
