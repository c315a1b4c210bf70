//! Fields: acceleration contributors for the particle solver
//!
//! A [`Field`] maps a target body (and `dt`) to an acceleration and carries an
//! `interact` gate, a gated-off field contributes exactly zero. Fields that
//! depend on another body hold that body's index and read its state from the
//! pre-tick snapshot handed to them, never a captured copy.
//!
//! Fields are grouped in a [`FieldSet`], either global (every body) or per
//! object for one tick through [`PerObjectFields`].

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::simulation::states::{try_normalize, Body, NVec3};

/// Default gate radius of point sources
pub const POINT_SOURCE_EPSILON: f64 = 0.1;

/// A body seen by a field: its index in the live list, the body itself and the
/// whole pre-tick list (for source lookups)
#[derive(Clone, Copy)]
pub struct Target<'a> {
    pub index: usize,
    pub body: &'a Body,
    pub bodies: &'a [Body],
}

impl<'a> Target<'a> {
    pub fn new(index: usize, bodies: &'a [Body]) -> Self {
        Self {
            index,
            body: &bodies[index],
            bodies,
        }
    }

    /// Another body of the snapshot, `None` for itself or an index out of range
    pub fn other(&self, index: usize) -> Option<&'a Body> {
        if index == self.index {
            return None;
        }
        self.bodies.get(index)
    }
}

pub trait Field {
    fn interact(&self, _target: &Target) -> bool {
        true
    }

    fn acceleration(&self, target: &Target, dt: f64) -> NVec3;

    /// Gated contribution used by the integrator
    fn contribution(&self, target: &Target, dt: f64) -> NVec3 {
        if self.interact(target) {
            self.acceleration(target, dt)
        } else {
            NVec3::zeros()
        }
    }
}

pub type BoxedField = Box<dyn Field + Send + Sync>;

/// Collection of fields whose contributions are summed per body
#[derive(Default)]
pub struct FieldSet {
    terms: Vec<BoxedField>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add a field
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: Field + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    pub fn push(&mut self, term: BoxedField) {
        self.terms.push(term);
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sum of every interacting field's acceleration on `target`
    pub fn accumulate(&self, target: &Target, dt: f64) -> NVec3 {
        self.terms
            .iter()
            .fold(NVec3::zeros(), |acc, f| acc + f.contribution(target, dt))
    }
}

/// Extra fields for single bodies, keyed by body index, valid for one tick
pub type PerObjectFields = HashMap<usize, FieldSet>;

// =========================================================================================
// basic fields
// =========================================================================================

/// Constant acceleration on every body
pub struct UniformForce {
    pub acceleration: NVec3,
}

impl Field for UniformForce {
    fn acceleration(&self, _target: &Target, _dt: f64) -> NVec3 {
        self.acceleration
    }
}

type AccelFn = Box<dyn Fn(&Body, f64) -> NVec3 + Send + Sync>;

/// Field backed by an arbitrary function, always interacting
pub struct Force {
    func: AccelFn,
}

impl Force {
    pub fn new(func: impl Fn(&Body, f64) -> NVec3 + Send + Sync + 'static) -> Self {
        Self {
            func: Box::new(func),
        }
    }
}

impl Field for Force {
    fn acceleration(&self, target: &Target, dt: f64) -> NVec3 {
        (self.func)(target.body, dt)
    }
}

/// Function-backed field around a fixed centre, switched off for bodies
/// within `epsilon` of it
pub struct PointSource {
    pub center: NVec3,
    pub epsilon: f64,
    func: AccelFn,
}

impl PointSource {
    pub fn new(
        center: NVec3,
        func: impl Fn(&Body, f64) -> NVec3 + Send + Sync + 'static,
    ) -> Self {
        Self {
            center,
            epsilon: POINT_SOURCE_EPSILON,
            func: Box::new(func),
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

impl Field for PointSource {
    fn interact(&self, target: &Target) -> bool {
        (self.center - target.body.position).norm_squared() > self.epsilon * self.epsilon
    }

    fn acceleration(&self, target: &Target, dt: f64) -> NVec3 {
        (self.func)(target.body, dt)
    }
}

// =========================================================================================
// motion fields
// =========================================================================================

/// Spring toward `origin`: a = -k (x - origin), restricted to `axes`
pub struct HarmonicMotion {
    pub origin: NVec3,
    pub k: f64,
    pub axes: [bool; 3],
}

impl HarmonicMotion {
    pub fn new(origin: NVec3, k: f64) -> Self {
        Self {
            origin,
            k,
            axes: [true; 3],
        }
    }

    /// Spring acting along a single axis (0 = x, 1 = y, 2 = z)
    pub fn along(origin: NVec3, k: f64, axis: usize) -> Self {
        let mut axes = [false; 3];
        if let Some(a) = axes.get_mut(axis) {
            *a = true;
        }
        Self { origin, k, axes }
    }
}

impl Field for HarmonicMotion {
    fn acceleration(&self, target: &Target, _dt: f64) -> NVec3 {
        let mut a = (target.body.position - self.origin) * -self.k;
        for (i, on) in self.axes.iter().enumerate() {
            if !on {
                a[i] = 0.0;
            }
        }
        a
    }
}

/// Centripetal field of magnitude 4π² r f², keeps a body on a circle of radius
/// `radius` around `center` at `frequency` turns per second
pub struct CyclicMotion {
    pub center: NVec3,
    pub frequency: f64,
    pub radius: f64,
}

impl CyclicMotion {
    /// Put `body` at the top of the circle (+y) and seed its history so it
    /// orbits in the xy-plane, clockwise means moving toward +x at the top.
    pub fn start(
        body: &mut Body,
        center: NVec3,
        frequency: f64,
        radius: f64,
        clockwise: bool,
        dt: f64,
    ) -> Self {
        let start = center + NVec3::new(0.0, radius, 0.0);
        body.set_position(start);

        // position one tick back on the same circle
        let phase = 2.0 * PI * frequency * dt;
        let side = if clockwise { -1.0 } else { 1.0 };
        let previous = center + radius * NVec3::new(side * phase.sin(), phase.cos(), 0.0);
        if let Some(m) = body.motion.as_mut() {
            m.last_position = previous;
        }

        Self {
            center,
            frequency,
            radius,
        }
    }

    pub fn period(&self) -> f64 {
        1.0 / self.frequency
    }
}

impl Field for CyclicMotion {
    fn acceleration(&self, target: &Target, _dt: f64) -> NVec3 {
        let magnitude = 4.0 * PI * PI * self.radius * self.frequency * self.frequency;
        try_normalize(self.center - target.body.position)
            .map(|n| n * magnitude)
            .unwrap_or_else(NVec3::zeros)
    }
}

// =========================================================================================
// body-sourced fields
// =========================================================================================

/// Newtonian attraction toward body `source`: a = G m_src / d²
pub struct UniversalGravity {
    pub source: usize,
    pub G: f64,
    pub epsilon: f64,
}

impl UniversalGravity {
    pub fn new(source: usize, G: f64) -> Self {
        Self {
            source,
            G,
            epsilon: POINT_SOURCE_EPSILON,
        }
    }
}

impl Field for UniversalGravity {
    fn interact(&self, target: &Target) -> bool {
        match target.other(self.source) {
            Some(src) => {
                (src.position - target.body.position).norm_squared() > self.epsilon * self.epsilon
            }
            None => false,
        }
    }

    fn acceleration(&self, target: &Target, _dt: f64) -> NVec3 {
        let Some(src) = target.other(self.source) else {
            return NVec3::zeros();
        };
        let r = src.position - target.body.position;
        let d2 = r.norm_squared();
        match try_normalize(r) {
            Some(n) if d2 > 0.0 => n * (self.G * src.mass / d2),
            _ => NVec3::zeros(),
        }
    }
}

/// Coulomb interaction with body `source`: a = k q_src q / (m d²), like charges repel.
/// Uncharged or massless targets feel nothing.
pub struct Electrostatic {
    pub source: usize,
    pub k: f64,
    pub epsilon: f64,
}

impl Electrostatic {
    pub fn new(source: usize, k: f64) -> Self {
        Self {
            source,
            k,
            epsilon: POINT_SOURCE_EPSILON,
        }
    }
}

impl Field for Electrostatic {
    fn interact(&self, target: &Target) -> bool {
        let Some(src) = target.other(self.source) else {
            return false;
        };
        src.charge.is_some()
            && target.body.charge.is_some()
            && target.body.mass > 0.0
            && (src.position - target.body.position).norm_squared() > self.epsilon * self.epsilon
    }

    fn acceleration(&self, target: &Target, _dt: f64) -> NVec3 {
        let Some(src) = target.other(self.source) else {
            return NVec3::zeros();
        };
        let (Some(qs), Some(q)) = (src.charge, target.body.charge) else {
            return NVec3::zeros();
        };
        let r = target.body.position - src.position;
        let d2 = r.norm_squared();
        match try_normalize(r) {
            Some(n) if d2 > 0.0 && target.body.mass > 0.0 => {
                n * (self.k * qs * q / (target.body.mass * d2))
            }
            _ => NVec3::zeros(),
        }
    }
}
