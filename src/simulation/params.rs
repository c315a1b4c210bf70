//! Numerical and physical parameters for the solver
//!
//! `Parameters` holds the runtime settings fixed at solver construction:
//! - tick rate (drives `dt`) and collision pass count,
//! - which collision response model is active,
//! - physical constants used by the gravity and electrostatic fields,
//! - an optional fixed grid cell size

use thiserror::Error;

pub const GRAVITATIONAL_CONSTANT: f64 = 6.67430e-11;
pub const COULOMB_CONSTANT: f64 = 8.99e9;

/// Cell size used when the grid is created before any radius is known
pub const INITIAL_CELL_SIZE: f64 = 3.0;
/// Slack applied to the mean collision radius when resizing the grid
pub const CELL_SIZE_FACTOR: f64 = 1.2;
/// Shard edge length, in cells
pub const SHARD_SIZE: i64 = 4;
/// Most cells a single footprint may span along one axis
pub const MAX_FOOTPRINT_SPAN: i64 = 64;

/// How overlapping pairs are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionResponse {
    /// Push both bodies apart along the normal, velocities untouched
    #[default]
    Positional,
    /// Positional correction plus an elastic velocity exchange along the normal
    Elastic,
}

#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("ticks_per_second must be greater than zero")]
    ZeroTickRate,
    #[error("grid cell size must be positive and finite, got {0}")]
    InvalidCellSize(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub ticks_per_second: u64,      // dt = 1 / ticks_per_second
    pub collision_per_tick: u64,    // N, runs N - 1 resolution passes
    pub response: CollisionResponse,
    pub G: f64,                     // gravitational constant
    pub k: f64,                     // coulomb constant
    pub grid_cell_size: Option<f64>, // Some(size) disables auto-resize
}

impl Parameters {
    pub fn new(ticks_per_second: u64, collision_per_tick: u64) -> Self {
        Self {
            ticks_per_second,
            collision_per_tick,
            response: CollisionResponse::Positional,
            G: GRAVITATIONAL_CONSTANT,
            k: COULOMB_CONSTANT,
            grid_cell_size: None,
        }
    }

    /// Reject configurations that would turn into NaN mid-run
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.ticks_per_second == 0 {
            return Err(SolverError::ZeroTickRate);
        }
        if let Some(size) = self.grid_cell_size {
            if !(size.is_finite() && size > 0.0) {
                return Err(SolverError::InvalidCellSize(size));
            }
        }
        Ok(())
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.ticks_per_second as f64
    }

    /// Number of sharded resolution passes per tick
    pub fn collision_passes(&self) -> u64 {
        self.collision_per_tick.saturating_sub(1)
    }
}
