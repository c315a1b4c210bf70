//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`SolverConfig`]     – tick rate, collision passes, response model, constants
//! - [`RunConfig`]        – how long the headless runner goes and how often it reports
//! - [`BodyConfig`]       – initial state and capabilities of each body
//! - [`FieldConfig`]      – global fields (and per-body fields)
//! - [`ConstraintConfig`] – positional constraints
//! - [`ScenarioConfig`]   – top-level wrapper
//!
//! # YAML format
//!
//! ```yaml
//! solver:
//!   ticks_per_second: 20
//!   collision_per_tick: 2     # runs 1 resolution pass per tick
//!   response: "positional"    # or "elastic"
//!
//! run:
//!   ticks: 400
//!   report_every: 20
//!
//! bodies:
//!   - x: [50.0, 90.0, 0.0]
//!     v: [3.0, 0.0, 0.0]
//!     m: 1.0
//!     radius: 2.0
//!   - x: [50.0, 50.0, 0.0]
//!     m: 100.0
//!     radius: 5.0
//!     fixed: true
//!
//! fields:
//!   - uniform: { acceleration: [0.0, -9.8, 0.0] }
//!
//! constraints:
//!   - sphere: { center: [50.0, 50.0, 0.0], radius: 50.0 }
//! ```
//!
//! The scenario builder maps this configuration into runtime bodies, fields
//! and a validated solver.

use serde::Deserialize;

/// Which collision response the solver uses
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseConfig {
    #[serde(rename = "positional")] // push overlapping bodies apart, velocities untouched
    #[default]
    Positional,

    #[serde(rename = "elastic")] // positional correction plus elastic velocity exchange
    Elastic,
}

/// Solver settings, fixed for the whole run
#[derive(Deserialize, Debug, Clone)]
pub struct SolverConfig {
    pub ticks_per_second: u64, // dt = 1 / ticks_per_second, must be > 0
    #[serde(default = "default_collision_per_tick")]
    pub collision_per_tick: u64, // N runs N - 1 collision passes
    #[serde(default)]
    pub response: ResponseConfig,
    pub gravitational_constant: Option<f64>, // defaults to 6.6743e-11
    pub coulomb_constant: Option<f64>,       // defaults to 8.99e9
    pub grid_cell_size: Option<f64>,         // pin the grid cell size, disables auto-resize
}

fn default_collision_per_tick() -> u64 {
    1
}

/// Headless run settings
#[derive(Deserialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default)]
    pub report_every: u64, // 0 = only report at the end
}

fn default_ticks() -> u64 {
    100
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            report_every: 0,
        }
    }
}

/// Field description, source bodies are referred to by index in `bodies`
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum FieldConfig {
    Uniform {
        acceleration: [f64; 3],
    },
    Harmonic {
        origin: [f64; 3],
        k: f64,
        #[serde(default = "all_axes")]
        axes: [bool; 3],
    },
    Cyclic {
        center: [f64; 3],
        frequency: f64,
        radius: f64,
    },
    Gravity {
        source: usize,
        epsilon: Option<f64>,
    },
    Electric {
        source: usize,
        epsilon: Option<f64>,
    },
}

fn all_axes() -> [bool; 3] {
    [true; 3]
}

/// Constraint description
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintConfig {
    Sphere { center: [f64; 3], radius: f64 },
    Box { min: [f64; 3], max: [f64; 3] },
}

/// Circular orbit around the body's configured position
#[derive(Deserialize, Debug, Clone)]
pub struct OrbitConfig {
    pub frequency: f64, // turns per second
    pub radius: f64,
    #[serde(default = "default_clockwise")]
    pub clockwise: bool,
}

fn default_clockwise() -> bool {
    true
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub x: [f64; 3], // initial position
    #[serde(default)]
    pub v: [f64; 3], // initial velocity, seeded into the Verlet history
    pub m: f64,      // mass
    pub radius: Option<f64>, // collision sphere, none = no collisions
    pub charge: Option<f64>,
    #[serde(default)]
    pub fixed: bool, // not movable
    pub chain_next: Option<usize>, // index of the body dragged along with this one
    #[serde(default)]
    pub fields: Vec<FieldConfig>, // fields acting on this body only
    pub orbit: Option<OrbitConfig>,
}

/// Top-level scenario configuration loaded from YAML
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub solver: SolverConfig,
    #[serde(default)]
    pub run: RunConfig,
    pub bodies: Vec<BodyConfig>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,
}
