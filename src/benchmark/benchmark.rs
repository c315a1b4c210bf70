use std::time::Instant;

use crate::simulation::constraints::SphericalContainment;
use crate::simulation::engine::Solver;
use crate::simulation::forces::UniformForce;
use crate::simulation::params::{CollisionResponse, Parameters};
use crate::simulation::states::{Body, NVec3};

/// Helper to build `n` colliding bodies inside a ball of radius ~20
fn make_bodies(n: usize, radius: f64) -> Vec<Body> {
    let mut bodies = Vec::with_capacity(n);

    for i in 0..n {
        let i_f = i as f64;
        // deterministic positions, no rand needed
        let x = NVec3::new(
            (i_f * 0.37).sin() * 15.0,
            (i_f * 0.13).cos() * 15.0,
            (i_f * 0.07).sin() * 15.0,
        );
        bodies.push(Body::new(x, 1.0).with_radius(radius));
    }

    bodies
}

/// Helper to build a solver with gravity and a containing sphere
fn make_solver(collision_per_tick: u64, response: CollisionResponse) -> Option<Solver> {
    let mut params = Parameters::new(60, collision_per_tick);
    params.response = response;

    let solver = Solver::new(params).ok()?;
    Some(
        solver
            .with_field(UniformForce {
                acceleration: NVec3::new(0.0, -9.8, 0.0),
            })
            .with_constraint(SphericalContainment {
                center: NVec3::zeros(),
                radius: 25.0,
            }),
    )
}

/// Tick cost against body count
pub fn bench_tick() {
    let ns = [250, 500, 1000, 2000, 4000, 8000];
    let steps = 10;

    for n in ns {
        let Some(mut solver) = make_solver(3, CollisionResponse::Positional) else {
            return;
        };
        let mut bodies = make_bodies(n, 0.5);

        // Warm up
        solver.compute(&mut bodies, None);

        let t0 = Instant::now();
        for _ in 0..steps {
            solver.compute(&mut bodies, None);
        }
        let per_tick = t0.elapsed().as_secs_f64() / steps as f64;

        println!("N = {n:5}, tick = {:8.6} s, budget used at 60 ticks/s = {:5.1}%", per_tick, per_tick * 60.0 * 100.0);
    }
}

/// Tick cost against collision pass count, positional vs elastic
/// Paste output directly into a spreadsheet to graph
pub fn bench_collision_passes() {
    let n = 2000;
    let steps = 10;

    println!("passes,positional_ms,elastic_ms");

    for collision_per_tick in 1..=8u64 {
        let mut row = Vec::with_capacity(2);
        for response in [CollisionResponse::Positional, CollisionResponse::Elastic] {
            let Some(mut solver) = make_solver(collision_per_tick, response) else {
                return;
            };
            let mut bodies = make_bodies(n, 0.5);

            let t0 = Instant::now();
            for _ in 0..steps {
                solver.compute(&mut bodies, None);
            }
            row.push(t0.elapsed().as_secs_f64() * 1000.0 / steps as f64);
        }

        println!("{},{:.6},{:.6}", collision_per_tick - 1, row[0], row[1]);
    }
}
