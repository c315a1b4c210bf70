//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! containing:
//! - a validated `Solver` with its global fields and constraints
//! - the live body list at tick 0
//! - per-body fields, handed to the solver every tick
//! - run settings for the headless runner
//!
//! Every index in the configuration (field sources, chain links) is checked
//! here so the solver never sees a dangling one.

use log::{debug, info};
use thiserror::Error;

use crate::configuration::config::{
    BodyConfig, ConstraintConfig, FieldConfig, ResponseConfig, RunConfig, ScenarioConfig,
};
use crate::simulation::constraints::{BoxClamp, BoxedConstraint, SphericalContainment};
use crate::simulation::engine::Solver;
use crate::simulation::forces::{
    BoxedField, CyclicMotion, Electrostatic, FieldSet, HarmonicMotion, PerObjectFields,
    UniformForce, UniversalGravity,
};
use crate::simulation::params::{
    CollisionResponse, Parameters, SolverError, COULOMB_CONSTANT, GRAVITATIONAL_CONSTANT,
};
use crate::simulation::states::{connect, Body, NVec3};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("body {body}: {reason}")]
    InvalidBody { body: usize, reason: String },
    #[error("field source {index} is out of range ({len} bodies)")]
    InvalidSource { index: usize, len: usize },
    #[error("body {body}: chain link to {next} is invalid ({len} bodies)")]
    InvalidChain { body: usize, next: usize, len: usize },
    #[error("constraint {index}: {reason}")]
    InvalidConstraint { index: usize, reason: String },
}

/// Runtime bundle for one simulation run
pub struct Scenario {
    pub solver: Solver,
    pub bodies: Vec<Body>,
    pub per_object: PerObjectFields,
    pub run: RunConfig,
    pub tick: u64, // ticks computed so far
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self, ScenarioError> {
        // Parameters (runtime) from SolverConfig
        let s_cfg = &cfg.solver;
        let parameters = Parameters {
            ticks_per_second: s_cfg.ticks_per_second,
            collision_per_tick: s_cfg.collision_per_tick,
            response: match s_cfg.response {
                ResponseConfig::Positional => CollisionResponse::Positional,
                ResponseConfig::Elastic => CollisionResponse::Elastic,
            },
            G: s_cfg.gravitational_constant.unwrap_or(GRAVITATIONAL_CONSTANT),
            k: s_cfg.coulomb_constant.unwrap_or(COULOMB_CONSTANT),
            grid_cell_size: s_cfg.grid_cell_size,
        };
        let mut solver = Solver::new(parameters.clone())?;
        let dt = parameters.dt();

        // Bodies: map `BodyConfig` -> runtime `Body`
        let mut bodies = Vec::with_capacity(cfg.bodies.len());
        for (i, bc) in cfg.bodies.iter().enumerate() {
            bodies.push(build_body(i, bc, dt)?);
        }

        // Chains, once every body exists
        let len = bodies.len();
        for (i, bc) in cfg.bodies.iter().enumerate() {
            if let Some(next) = bc.chain_next {
                if next >= len || next == i {
                    return Err(ScenarioError::InvalidChain { body: i, next, len });
                }
                connect(&mut bodies, i, next);
            }
        }

        // Per-body fields, orbits reposition their body
        let mut per_object = PerObjectFields::new();
        for (i, bc) in cfg.bodies.iter().enumerate() {
            let mut set = FieldSet::new();
            for fc in &bc.fields {
                set.push(build_field(fc, len, &parameters)?);
            }
            if let Some(orbit) = &bc.orbit {
                let center = NVec3::from(bc.x);
                let field = CyclicMotion::start(
                    &mut bodies[i],
                    center,
                    orbit.frequency,
                    orbit.radius,
                    orbit.clockwise,
                    dt,
                );
                set.push(Box::new(field));
            }
            if !set.is_empty() {
                per_object.insert(i, set);
            }
        }

        for fc in &cfg.fields {
            solver.fields_mut().push(build_field(fc, len, &parameters)?);
        }
        for (i, cc) in cfg.constraints.iter().enumerate() {
            solver.constraints_mut().push(build_constraint(i, cc)?);
        }

        info!(
            "scenario: {} bodies, {} global fields, {} constraints, {} ticks/s",
            bodies.len(),
            cfg.fields.len(),
            cfg.constraints.len(),
            parameters.ticks_per_second
        );

        Ok(Self {
            solver,
            bodies,
            per_object,
            run: cfg.run,
            tick: 0,
        })
    }

    /// Advance one tick
    pub fn step(&mut self) {
        let per_object = (!self.per_object.is_empty()).then_some(&self.per_object);
        self.solver.compute(&mut self.bodies, per_object);
        self.tick += 1;
    }

    /// Advance `run.ticks` ticks, reporting every `run.report_every`
    pub fn run(&mut self) {
        for _ in 0..self.run.ticks {
            self.step();
            if self.run.report_every > 0 && self.tick % self.run.report_every == 0 {
                self.report();
            }
        }
    }

    /// Log the centroid at info level and every body at debug level
    pub fn report(&self) {
        let t = self.tick as f64 * self.solver.dt();
        info!("t = {t:.3} s (tick {}), centroid {:?}", self.tick, self.centroid().as_slice());
        for (i, b) in self.bodies.iter().enumerate() {
            debug!("  body {i}: x = {:?}", b.position.as_slice());
        }
    }

    pub fn centroid(&self) -> NVec3 {
        if self.bodies.is_empty() {
            return NVec3::zeros();
        }
        let sum = self
            .bodies
            .iter()
            .fold(NVec3::zeros(), |acc, b| acc + b.position);
        sum / self.bodies.len() as f64
    }
}

fn build_body(index: usize, bc: &BodyConfig, dt: f64) -> Result<Body, ScenarioError> {
    let invalid = |reason: &str| ScenarioError::InvalidBody {
        body: index,
        reason: reason.to_string(),
    };

    if !(bc.m.is_finite() && bc.m >= 0.0) {
        return Err(invalid("mass must be finite and non-negative"));
    }
    if bc.x.iter().chain(bc.v.iter()).any(|c| !c.is_finite()) {
        return Err(invalid("position and velocity must be finite"));
    }

    let position = NVec3::from(bc.x);
    let mut body = if bc.fixed {
        Body::fixed(position, bc.m)
    } else {
        Body::new(position, bc.m)
    };

    if let Some(r) = bc.radius {
        if !(r.is_finite() && r >= 0.0) {
            return Err(invalid("radius must be finite and non-negative"));
        }
        body = body.with_radius(r);
    }
    if let Some(q) = bc.charge {
        body = body.with_charge(q);
    }
    if bc.fixed && bc.orbit.is_some() {
        return Err(invalid("a fixed body cannot orbit"));
    }
    body.set_velocity(NVec3::from(bc.v), dt);
    Ok(body)
}

fn build_field(fc: &FieldConfig, len: usize, p: &Parameters) -> Result<BoxedField, ScenarioError> {
    let check = |index: usize| {
        if index < len {
            Ok(())
        } else {
            Err(ScenarioError::InvalidSource { index, len })
        }
    };

    let field: BoxedField = match fc {
        FieldConfig::Uniform { acceleration } => Box::new(UniformForce {
            acceleration: NVec3::from(*acceleration),
        }),
        FieldConfig::Harmonic { origin, k, axes } => Box::new(HarmonicMotion {
            origin: NVec3::from(*origin),
            k: *k,
            axes: *axes,
        }),
        FieldConfig::Cyclic {
            center,
            frequency,
            radius,
        } => Box::new(CyclicMotion {
            center: NVec3::from(*center),
            frequency: *frequency,
            radius: *radius,
        }),
        FieldConfig::Gravity { source, epsilon } => {
            check(*source)?;
            let mut f = UniversalGravity::new(*source, p.G);
            if let Some(e) = epsilon {
                f.epsilon = *e;
            }
            Box::new(f)
        }
        FieldConfig::Electric { source, epsilon } => {
            check(*source)?;
            let mut f = Electrostatic::new(*source, p.k);
            if let Some(e) = epsilon {
                f.epsilon = *e;
            }
            Box::new(f)
        }
    };
    Ok(field)
}

fn build_constraint(index: usize, cc: &ConstraintConfig) -> Result<BoxedConstraint, ScenarioError> {
    let constraint: BoxedConstraint = match cc {
        ConstraintConfig::Sphere { center, radius } => {
            if !(radius.is_finite() && *radius > 0.0) {
                return Err(ScenarioError::InvalidConstraint {
                    index,
                    reason: "sphere radius must be positive".to_string(),
                });
            }
            Box::new(SphericalContainment {
                center: NVec3::from(*center),
                radius: *radius,
            })
        }
        ConstraintConfig::Box { min, max } => {
            if min.iter().zip(max.iter()).any(|(lo, hi)| lo > hi) {
                return Err(ScenarioError::InvalidConstraint {
                    index,
                    reason: "box min must not exceed max".to_string(),
                });
            }
            Box::new(BoxClamp {
                min: NVec3::from(*min),
                max: NVec3::from(*max),
            })
        }
    };
    Ok(constraint)
}
