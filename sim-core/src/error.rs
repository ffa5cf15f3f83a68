use thiserror::Error;

/// Failures reported by the simulation core.
///
/// None of these are fatal to a running simulation: the stepper absorbs
/// `PoolExhausted` and `QueueFull` locally and only counts them in its
/// [`crate::simulation::TickReport`]. `InvalidConfig` is returned when a
/// simulation is built from a configuration that cannot be simulated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("particle pool is full ({capacity} particles)")]
    PoolExhausted { capacity: usize },
    #[error("spawn queue is full ({capacity} pending requests)")]
    QueueFull { capacity: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
