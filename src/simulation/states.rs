//! Core state types for the particle solver.
//!
//! A [`Body`] always has a position and a mass. Everything else is an optional
//! capability that the solver queries per tick:
//! - [`Motion`]       movable: previous position + pending acceleration
//! - [`CollisionBox`] collided: a sphere used for broad and narrow phase
//! - `charge`         charged: consumed by the electrostatic field only
//! - [`ChainLink`]    chained: index links into the body arena
//!
//! Bodies live in a plain `Vec<Body>` owned by the host, links and field
//! sources refer to bodies by their index in that list.

use nalgebra::Vector3;
pub type NVec3 = Vector3<f64>;

/// Movable state, position Verlet keeps velocity implicit in `last_position`
#[derive(Debug, Clone, PartialEq)]
pub struct Motion {
    pub last_position: NVec3, // position at the previous tick
    pub acceleration: NVec3,  // pending acceleration, consumed by the next tick
}

/// Collision volume of a body, anchored nowhere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBox {
    pub radius: f64,
}

impl CollisionBox {
    /// Anchor the volume at a world position
    pub fn translate(&self, center: NVec3) -> TranslatedBox {
        TranslatedBox {
            radius: self.radius,
            center,
        }
    }
}

/// A collision sphere anchored at a world position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslatedBox {
    pub radius: f64,
    pub center: NVec3,
}

impl TranslatedBox {
    /// Spheres touching at exactly `r1 + r2` count as overlapping
    pub fn collided(&self, other: &TranslatedBox) -> bool {
        (other.center - self.center).norm() <= self.radius + other.radius
    }
}

/// Links of a chained body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainLink {
    pub next: Option<usize>,
    pub prev: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub position: NVec3,
    pub mass: f64,
    pub motion: Option<Motion>,
    pub collider: Option<CollisionBox>,
    pub charge: Option<f64>,
    pub chain: Option<ChainLink>,
}

impl Body {
    /// Movable point mass at rest
    pub fn new(position: NVec3, mass: f64) -> Self {
        Self {
            position,
            mass,
            motion: Some(Motion {
                last_position: position,
                acceleration: NVec3::zeros(),
            }),
            collider: None,
            charge: None,
            chain: None,
        }
    }

    /// Non-movable body, it still takes part in collisions and can act as a field source
    pub fn fixed(position: NVec3, mass: f64) -> Self {
        Self {
            motion: None,
            ..Self::new(position, mass)
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.collider = Some(CollisionBox { radius });
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = Some(charge);
        self
    }

    // capability queries ====================================================================

    pub fn is_movable(&self) -> bool {
        self.motion.is_some()
    }

    pub fn radius(&self) -> Option<f64> {
        self.collider.map(|c| c.radius)
    }

    /// Collision sphere at the current position, `None` without a collider
    pub fn translated_box(&self) -> Option<TranslatedBox> {
        self.collider.map(|c| c.translate(self.position))
    }

    pub fn last_position(&self) -> NVec3 {
        match &self.motion {
            Some(m) => m.last_position,
            None => self.position,
        }
    }

    /// Pending acceleration, zero for fixed bodies
    pub fn acceleration(&self) -> NVec3 {
        match &self.motion {
            Some(m) => m.acceleration,
            None => NVec3::zeros(),
        }
    }

    // movable operations, all no-ops on fixed bodies ========================================

    /// Add an instantaneous acceleration, applied once by the next tick
    pub fn accelerate(&mut self, a: NVec3) {
        if let Some(m) = self.motion.as_mut() {
            m.acceleration += a;
        }
    }

    /// Roll history forward: `last = current`, pending acceleration is consumed
    pub fn advance_tick(&mut self) {
        let position = self.position;
        if let Some(m) = self.motion.as_mut() {
            m.last_position = position;
            m.acceleration = NVec3::zeros();
        }
    }

    pub fn set_position(&mut self, position: NVec3) {
        if self.motion.is_some() {
            self.position = position;
        }
    }

    /// Seed history so the next tick moves the body with velocity `v`
    pub fn set_velocity(&mut self, v: NVec3, dt: f64) {
        let position = self.position;
        if let Some(m) = self.motion.as_mut() {
            m.last_position = position - v * dt;
        }
    }

    /// Velocity implied by the Verlet history
    pub fn velocity(&self, dt: f64) -> NVec3 {
        (self.position - self.last_position()) / dt
    }
}

/// Link `a -> b` as a chain, `b` is dragged along when `a` is displaced
pub fn connect(bodies: &mut [Body], a: usize, b: usize) {
    if a == b || a >= bodies.len() || b >= bodies.len() {
        return;
    }
    bodies[a].chain.get_or_insert_with(ChainLink::default).next = Some(b);
    bodies[b].chain.get_or_insert_with(ChainLink::default).prev = Some(a);
}

/// Normalize `v`, returning `None` when its length is zero or not finite
pub fn try_normalize(v: NVec3) -> Option<NVec3> {
    let n = v.norm();
    if n > 0.0 && n.is_finite() {
        Some(v / n)
    } else {
        None
    }
}
