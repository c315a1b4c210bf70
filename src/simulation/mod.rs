pub mod states;
pub mod params;
pub mod grid;
pub mod forces;
pub mod constraints;
pub mod integrator;
pub mod collision;
pub mod engine;
pub mod scenario;
