//! Positional constraints, applied once per tick after integration and collisions.
//!
//! Constraints only move the position, history is left alone, so a clamp
//! also damps the velocity that pushed the body out.

use crate::simulation::states::{try_normalize, Body, NVec3};

pub trait Constraint {
    fn apply(&self, body: &mut Body);
}

pub type BoxedConstraint = Box<dyn Constraint + Send + Sync>;

/// Keeps the whole collision sphere of a body inside a sphere
pub struct SphericalContainment {
    pub center: NVec3,
    pub radius: f64,
}

impl Constraint for SphericalContainment {
    fn apply(&self, body: &mut Body) {
        let r = body.radius().unwrap_or(0.0);
        let d = body.position - self.center;
        if d.norm() + r <= self.radius {
            return;
        }
        // a body sitting on the centre of a too-small sphere gets pushed along +x
        let dir = try_normalize(d).unwrap_or_else(NVec3::x);
        body.set_position(self.center + dir * (self.radius - r).max(0.0));
    }
}

/// Clamps each axis so the collision sphere stays in `[min, max]`
pub struct BoxClamp {
    pub min: NVec3,
    pub max: NVec3,
}

impl Constraint for BoxClamp {
    fn apply(&self, body: &mut Body) {
        let r = body.radius().unwrap_or(0.0);
        let mut p = body.position;
        for axis in 0..3 {
            let lo = self.min[axis] + r;
            let hi = self.max[axis] - r;
            p[axis] = if lo > hi {
                0.5 * (self.min[axis] + self.max[axis])
            } else {
                p[axis].clamp(lo, hi)
            };
        }
        if p != body.position {
            body.set_position(p);
        }
    }
}

type ConstraintFn = Box<dyn Fn(&mut Body) + Send + Sync>;

/// Constraint backed by an arbitrary function
pub struct FnConstraint {
    func: ConstraintFn,
}

impl FnConstraint {
    pub fn new(func: impl Fn(&mut Body) + Send + Sync + 'static) -> Self {
        Self {
            func: Box::new(func),
        }
    }
}

impl Constraint for FnConstraint {
    fn apply(&self, body: &mut Body) {
        (self.func)(body)
    }
}
