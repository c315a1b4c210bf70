pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use simulation::states::{Body, Motion, CollisionBox, TranslatedBox, ChainLink, NVec3, connect};
pub use simulation::params::{Parameters, CollisionResponse, SolverError};
pub use simulation::grid::{SpatialGrid, CellKey, CellMap, split_into_shards};
pub use simulation::forces::{Field, FieldSet, PerObjectFields, Target, Force, PointSource, UniformForce, HarmonicMotion, CyclicMotion, UniversalGravity, Electrostatic};
pub use simulation::constraints::{Constraint, SphericalContainment, BoxClamp, FnConstraint};
pub use simulation::integrator::{verlet_integrator, verlet_step};
pub use simulation::collision::{resolve_collisions, PassStats};
pub use simulation::engine::Solver;
pub use simulation::scenario::{Scenario, ScenarioError};

pub use configuration::config::{ScenarioConfig, SolverConfig, RunConfig, BodyConfig, FieldConfig, ConstraintConfig, OrbitConfig, ResponseConfig};

pub use benchmark::benchmark::{bench_tick, bench_collision_passes};
