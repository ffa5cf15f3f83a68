use rand::{SeedableRng, rngs::StdRng};

/// Random source owned by a simulation.
pub type SimRng = StdRng;

/// Deterministic generator for `Some(seed)`, OS-seeded otherwise.
pub fn seeded(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
