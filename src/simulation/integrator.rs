//! Fixed-step position Verlet integrator
//!
//! x_n+1 = 2 x_n - x_n-1 + a_n dt²
//!
//! Velocity is never stored, it is implied by the body's last position. Every
//! body is integrated independently on the rayon pool against the pre-tick
//! snapshot of all bodies, history is advanced only once all next positions
//! are known.

use rayon::prelude::*;

use super::forces::{FieldSet, PerObjectFields, Target};
use super::states::{Body, NVec3};

/// One Verlet step from current/last position and the acceleration at `current`
pub fn verlet_step(current: NVec3, last: NVec3, a: NVec3, dt: f64) -> NVec3 {
    2.0 * current - last + a * (dt * dt)
}

/// Total acceleration on body `index`: its pending acceleration, every
/// interacting global field, then its own per-tick fields
pub fn total_acceleration(
    index: usize,
    bodies: &[Body],
    fields: &FieldSet,
    per_object: Option<&PerObjectFields>,
    dt: f64,
) -> NVec3 {
    let target = Target::new(index, bodies);
    let mut a = target.body.acceleration() + fields.accumulate(&target, dt);
    if let Some(own) = per_object.and_then(|m| m.get(&index)) {
        a += own.accumulate(&target, dt);
    }
    a
}

/// Advance every movable body by one tick, fixed bodies are left untouched
pub fn verlet_integrator(
    bodies: &mut [Body],
    fields: &FieldSet,
    per_object: Option<&PerObjectFields>,
    dt: f64,
) {
    if bodies.is_empty() {
        return;
    }

    // Fan out: next positions from the pre-tick snapshot
    let snapshot: &[Body] = bodies;
    let next: Vec<Option<NVec3>> = snapshot
        .par_iter()
        .enumerate()
        .map(|(i, b)| {
            let motion = b.motion.as_ref()?;
            let a = total_acceleration(i, snapshot, fields, per_object, dt);
            Some(verlet_step(b.position, motion.last_position, a, dt))
        })
        .collect();

    // Commit: history first, then the new position
    bodies
        .par_iter_mut()
        .zip(next.into_par_iter())
        .for_each(|(b, next)| {
            if let Some(next) = next {
                b.advance_tick();
                b.set_position(next);
            }
        });
}
