use approx::{assert_abs_diff_eq, assert_relative_eq};

use pdsolve::simulation::states::{connect, Body, NVec3};
use pdsolve::simulation::params::{CollisionResponse, Parameters, SolverError};
use pdsolve::simulation::grid::SpatialGrid;
use pdsolve::simulation::forces::{
    CyclicMotion, Electrostatic, Field, FieldSet, Force, HarmonicMotion, PerObjectFields,
    PointSource, Target, UniformForce, UniversalGravity,
};
use pdsolve::simulation::constraints::{BoxClamp, Constraint, FnConstraint, SphericalContainment};
use pdsolve::simulation::collision::resolve_collisions;
use pdsolve::simulation::engine::Solver;
use pdsolve::simulation::scenario::{Scenario, ScenarioError};
use pdsolve::ScenarioConfig;

/// Two movable spheres of radius `r` overlapping along x
pub fn overlapping_pair(r: f64) -> Vec<Body> {
    vec![
        Body::new(NVec3::new(1.0, 1.0, 1.0), 1.0).with_radius(r),
        Body::new(NVec3::new(2.5, 1.0, 1.0), 1.0).with_radius(r),
    ]
}

/// Grid over every collider, cell size 1.2x the given radius
pub fn grid_for(bodies: &[Body], radius: f64) -> SpatialGrid<usize> {
    let mut grid = SpatialGrid::new(1.2 * radius).unwrap();
    for (i, b) in bodies.iter().enumerate() {
        if let Some(r) = b.radius() {
            grid.put(&b.position, r, i);
        }
    }
    grid
}

/// Default solver for tests
pub fn test_solver(ticks_per_second: u64, collision_per_tick: u64) -> Solver {
    Solver::new(Parameters::new(ticks_per_second, collision_per_tick)).unwrap()
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn verlet_preserves_uniform_motion() {
    let mut solver = test_solver(10, 1);
    let dt = solver.dt();

    let mut body = Body::new(NVec3::new(1.0, 2.0, 3.0), 1.0);
    body.set_velocity(NVec3::new(0.5, -1.0, 2.0), dt);
    let mut bodies = vec![body];

    for _ in 0..5 {
        let current = bodies[0].position;
        let last = bodies[0].last_position();
        solver.compute(&mut bodies, None);

        assert_eq!(bodies[0].position, 2.0 * current - last);
        assert_eq!(bodies[0].last_position(), current);
    }
    assert_relative_eq!(bodies[0].velocity(dt), NVec3::new(0.5, -1.0, 2.0), epsilon = 1e-9);
}

#[test]
fn verlet_applies_field_acceleration() {
    let mut solver = test_solver(2, 1).with_field(UniformForce {
        acceleration: NVec3::new(0.0, -8.0, 0.0),
    });
    let mut bodies = vec![Body::new(NVec3::zeros(), 1.0)];

    // next = 2x - x + a dt² = (0, -8 * 0.25, 0)
    solver.compute(&mut bodies, None);
    assert_relative_eq!(bodies[0].position, NVec3::new(0.0, -2.0, 0.0));
}

#[test]
fn accelerate_is_consumed_by_one_tick() {
    let mut solver = test_solver(1, 1);
    let mut bodies = vec![Body::new(NVec3::zeros(), 1.0)];
    bodies[0].accelerate(NVec3::new(1.0, 0.0, 0.0));

    solver.compute(&mut bodies, None);
    assert_relative_eq!(bodies[0].position, NVec3::new(1.0, 0.0, 0.0));
    assert_eq!(bodies[0].acceleration(), NVec3::zeros());

    // afterwards the body coasts
    solver.compute(&mut bodies, None);
    assert_relative_eq!(bodies[0].position, NVec3::new(2.0, 0.0, 0.0));
}

#[test]
fn fixed_bodies_do_not_move() {
    let mut solver = test_solver(10, 1).with_field(UniformForce {
        acceleration: NVec3::new(0.0, -9.8, 0.0),
    });
    let mut bodies = vec![Body::fixed(NVec3::new(3.0, 3.0, 3.0), 1.0)];
    bodies[0].accelerate(NVec3::new(5.0, 0.0, 0.0));

    for _ in 0..3 {
        solver.compute(&mut bodies, None);
    }
    assert_eq!(bodies[0].position, NVec3::new(3.0, 3.0, 3.0));
}

#[test]
fn per_object_fields_only_touch_their_body() {
    let mut solver = test_solver(1, 1);
    let mut bodies = vec![Body::new(NVec3::zeros(), 1.0), Body::new(NVec3::zeros(), 1.0)];

    let mut per_object = PerObjectFields::new();
    per_object.insert(
        1,
        FieldSet::new().with(UniformForce {
            acceleration: NVec3::new(0.0, 0.0, 3.0),
        }),
    );

    solver.compute(&mut bodies, Some(&per_object));
    assert_eq!(bodies[0].position, NVec3::zeros());
    assert_relative_eq!(bodies[1].position, NVec3::new(0.0, 0.0, 3.0));
}

#[test]
fn sources_are_read_from_the_pre_tick_snapshot() {
    // both bodies pull on each other, both must see the other's old position
    let mut solver = test_solver(1, 1);
    let mut bodies = vec![
        Body::new(NVec3::new(-1.0, 0.0, 0.0), 1.0),
        Body::new(NVec3::new(1.0, 0.0, 0.0), 1.0),
    ];
    let mut per_object = PerObjectFields::new();
    per_object.insert(0, FieldSet::new().with(UniversalGravity::new(1, 4.0)));
    per_object.insert(1, FieldSet::new().with(UniversalGravity::new(0, 4.0)));

    solver.compute(&mut bodies, Some(&per_object));
    assert_relative_eq!(bodies[0].position, NVec3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(bodies[1].position, NVec3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
}

// ==================================================================================
// Grid tests
// ==================================================================================

#[test]
fn grid_get_returns_inserted_value_once() {
    let mut grid: SpatialGrid<usize> = SpatialGrid::new(1.0).unwrap();
    grid.put(&NVec3::new(0.5, 0.5, 0.5), 2.5, 7);
    grid.put(&NVec3::new(-3.2, 4.0, 0.0), 0.3, 8);

    for query in [
        NVec3::new(0.5, 0.5, 0.5),
        NVec3::new(2.0, 0.0, -1.5),
        NVec3::new(-1.2, 1.9, 2.1),
    ] {
        let found = grid.get(&query, 1.0);
        assert_eq!(found.iter().filter(|v| **v == 7).count(), 1, "query {query:?}");
    }

    let found = grid.get(&NVec3::new(-3.2, 4.0, 0.0), 0.0);
    assert_eq!(found, vec![8]);
}

#[test]
fn grid_put_retracts_previous_insertion() {
    let mut grid: SpatialGrid<usize> = SpatialGrid::new(1.0).unwrap();
    grid.put(&NVec3::new(0.5, 0.5, 0.5), 0.5, 1);
    grid.put(&NVec3::new(10.5, 0.5, 0.5), 0.5, 1);

    assert_eq!(grid.len(), 1);
    assert!(grid.get(&NVec3::new(0.5, 0.5, 0.5), 0.0).is_empty());
    assert_eq!(grid.get(&NVec3::new(10.5, 0.5, 0.5), 0.0), vec![1]);

    let total: usize = grid.all_cells().values().map(|v| v.len()).sum();
    assert_eq!(total, grid.cells_overlapping(&NVec3::new(10.5, 0.5, 0.5), 0.5).len());
}

#[test]
fn grid_resize_and_clear_drop_contents() {
    let mut grid: SpatialGrid<usize> = SpatialGrid::new(1.0).unwrap();
    grid.put(&NVec3::zeros(), 1.0, 1);
    grid.resize(4.0).unwrap();
    assert!(grid.is_empty());
    assert!(grid.all_cells().is_empty());
    assert_eq!(grid.cell_size(), 4.0);

    grid.put(&NVec3::zeros(), 1.0, 2);
    grid.clear();
    assert!(grid.get(&NVec3::zeros(), 1.0).is_empty());

    assert_eq!(grid.resize(0.0), Err(SolverError::InvalidCellSize(0.0)));
    assert!(grid.resize(f64::NAN).is_err());
    assert_eq!(grid.cell_size(), 4.0);
}

#[test]
fn solver_skips_resize_without_colliders() {
    let mut solver = test_solver(10, 2);
    let mut bodies = vec![Body::new(NVec3::zeros(), 1.0), Body::new(NVec3::new(1.0, 0.0, 0.0), 1.0)];

    solver.compute(&mut bodies, None);

    let grid = solver.grid().unwrap();
    assert_eq!(grid.cell_size(), 3.0);
    assert!(grid.is_empty());
    assert!(bodies.iter().all(|b| b.position.iter().all(|c| c.is_finite())));
}

#[test]
fn solver_sizes_grid_from_mean_radius() {
    let mut solver = test_solver(10, 1);
    let mut bodies = vec![
        Body::new(NVec3::new(0.0, 0.0, 0.0), 1.0).with_radius(1.0),
        Body::new(NVec3::new(10.0, 0.0, 0.0), 1.0).with_radius(3.0),
        Body::new(NVec3::new(20.0, 0.0, 0.0), 1.0),
    ];
    solver.compute(&mut bodies, None);

    let grid = solver.grid().unwrap();
    assert_relative_eq!(grid.cell_size(), 2.4);
    assert_eq!(grid.len(), 2);
}

#[test]
fn supplied_grid_keeps_its_cell_size() {
    let mut solver = test_solver(10, 1).with_grid(SpatialGrid::new(0.75).unwrap());
    let mut bodies = overlapping_pair(1.0);
    solver.compute(&mut bodies, None);
    assert_eq!(solver.grid().unwrap().cell_size(), 0.75);
}

// ==================================================================================
// Collision tests
// ==================================================================================

#[test]
fn collision_separates_to_touching_and_splits_evenly() {
    let mut bodies = overlapping_pair(1.0);
    let grid = grid_for(&bodies, 1.0);

    let stats = resolve_collisions(&mut bodies, &grid, CollisionResponse::Positional);

    assert!(stats.contacts >= 1);
    assert_relative_eq!((bodies[1].position - bodies[0].position).norm(), 2.0, epsilon = 1e-12);
    assert_relative_eq!(bodies[0].position, NVec3::new(0.75, 1.0, 1.0), epsilon = 1e-12);
    assert_relative_eq!(bodies[1].position, NVec3::new(2.75, 1.0, 1.0), epsilon = 1e-12);

    // positional response leaves history alone
    assert_eq!(bodies[0].last_position(), NVec3::new(1.0, 1.0, 1.0));
}

#[test]
fn fixed_collider_pushes_movable_body_the_whole_way() {
    let mut bodies = vec![
        Body::new(NVec3::new(1.0, 1.0, 1.0), 1.0).with_radius(1.0),
        Body::fixed(NVec3::new(2.5, 1.0, 1.0), 1.0).with_radius(1.0),
    ];
    let grid = grid_for(&bodies, 1.0);

    resolve_collisions(&mut bodies, &grid, CollisionResponse::Positional);

    assert_relative_eq!(bodies[0].position, NVec3::new(0.5, 1.0, 1.0), epsilon = 1e-12);
    assert_eq!(bodies[1].position, NVec3::new(2.5, 1.0, 1.0));
}

#[test]
fn coincident_centres_do_not_produce_nan() {
    let mut bodies = vec![
        Body::new(NVec3::new(1.0, 1.0, 1.0), 1.0).with_radius(1.0),
        Body::new(NVec3::new(1.0, 1.0, 1.0), 1.0).with_radius(1.0),
    ];
    let grid = grid_for(&bodies, 1.0);

    resolve_collisions(&mut bodies, &grid, CollisionResponse::Positional);

    assert!(bodies.iter().all(|b| b.position.iter().all(|c| c.is_finite())));
    assert_relative_eq!((bodies[0].position - bodies[1].position).norm(), 2.0, epsilon = 1e-12);
}

#[test]
fn elastic_response_exchanges_velocity_head_on() {
    let mut a = Body::new(NVec3::new(0.0, 0.0, 0.0), 1.0).with_radius(1.0);
    a.set_velocity(NVec3::new(0.1, 0.0, 0.0), 1.0);
    let b = Body::new(NVec3::new(1.5, 0.0, 0.0), 1.0).with_radius(1.0);
    let mut bodies = vec![a, b];
    let grid = grid_for(&bodies, 1.0);

    resolve_collisions(&mut bodies, &grid, CollisionResponse::Elastic);

    assert_relative_eq!((bodies[1].position - bodies[0].position).norm(), 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(bodies[0].velocity(1.0), NVec3::zeros(), epsilon = 1e-12);
    assert_relative_eq!(bodies[1].velocity(1.0), NVec3::new(0.1, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn chained_body_is_dragged_by_correction() {
    let mut bodies = overlapping_pair(1.0);
    bodies.push(Body::new(NVec3::new(10.0, 10.0, 10.0), 1.0));
    connect(&mut bodies, 0, 2);
    let grid = grid_for(&bodies, 1.0);

    resolve_collisions(&mut bodies, &grid, CollisionResponse::Positional);

    assert_relative_eq!(bodies[2].position, NVec3::new(9.75, 10.0, 10.0), epsilon = 1e-12);
    assert_eq!(bodies[2].chain.and_then(|c| c.prev), Some(0));
}

#[test]
fn pair_seen_by_several_shards_is_split_once() {
    // footprints reach into the y = -1 and x = 1 shards, every one of them sees the pair
    let mut bodies = vec![
        Body::new(NVec3::new(3.7, 0.5, 0.5), 1.0).with_radius(0.6),
        Body::new(NVec3::new(4.3, 0.5, 0.5), 1.0).with_radius(0.6),
    ];
    let mut grid = SpatialGrid::new(1.0).unwrap();
    for (i, b) in bodies.iter().enumerate() {
        grid.put(&b.position, 0.6, i);
    }

    let stats = resolve_collisions(&mut bodies, &grid, CollisionResponse::Positional);

    assert!(stats.shards > 1);
    assert_eq!(stats.contacts, 1);
    assert_eq!(stats.moved, 2);
    assert_relative_eq!(bodies[0].position, NVec3::new(3.4, 0.5, 0.5), epsilon = 1e-12);
    assert_relative_eq!(bodies[1].position, NVec3::new(4.6, 0.5, 0.5), epsilon = 1e-12);
}

#[test]
fn body_drifting_across_a_shard_edge_is_still_corrected() {
    // grid is built before integration: `a` starts in shard x = 1 and ends the
    // integrate phase in cell x = 3 (shard x = 0), which never sees `b`
    let mut solver = test_solver(10, 2).with_grid(SpatialGrid::new(1.0).unwrap());
    let mut a = Body::new(NVec3::new(4.05, 0.5, 0.5), 1.0).with_radius(0.5);
    a.set_velocity(NVec3::new(-1.0, 0.0, 0.0), solver.dt());
    let b = Body::new(NVec3::new(4.9, 0.5, 0.5), 1.0).with_radius(0.5);
    let mut bodies = vec![a, b];

    solver.compute(&mut bodies, None);

    assert_relative_eq!((bodies[1].position - bodies[0].position).norm(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(bodies[0].position, NVec3::new(3.925, 0.5, 0.5), epsilon = 1e-12);
    assert_relative_eq!(bodies[1].position, NVec3::new(4.925, 0.5, 0.5), epsilon = 1e-12);
}

#[test]
fn low_side_overlap_is_found() {
    // `b` only reaches cell x = -1 through the low side of its footprint
    let mut bodies = vec![
        Body::new(NVec3::new(-0.3, 0.5, 0.5), 1.0).with_radius(0.2),
        Body::new(NVec3::new(0.1, 0.5, 0.5), 1.0).with_radius(0.3),
    ];
    let mut grid = SpatialGrid::new(1.0).unwrap();
    for (i, b) in bodies.iter().enumerate() {
        if let Some(r) = b.radius() {
            grid.put(&b.position, r, i);
        }
    }
    assert!(grid.get(&NVec3::new(-0.3, 0.5, 0.5), 0.0).contains(&1));

    resolve_collisions(&mut bodies, &grid, CollisionResponse::Positional);
    assert_relative_eq!((bodies[1].position - bodies[0].position).norm(), 0.5, epsilon = 1e-12);
}

#[test]
fn collision_pass_count_is_n_minus_one() {
    // at rest, so integration leaves them where they are
    let mut once = overlapping_pair(1.0);
    test_solver(10, 1).compute(&mut once, None);
    assert_eq!(once[0].position, NVec3::new(1.0, 1.0, 1.0));

    let mut twice = overlapping_pair(1.0);
    test_solver(10, 2).compute(&mut twice, None);
    assert_relative_eq!((twice[1].position - twice[0].position).norm(), 2.0, epsilon = 1e-12);
}

// ==================================================================================
// Constraint tests
// ==================================================================================

#[test]
fn spherical_containment_keeps_surface_inside() {
    let c = SphericalContainment {
        center: NVec3::zeros(),
        radius: 10.0,
    };
    let mut body = Body::new(NVec3::new(20.0, 0.0, 0.0), 1.0).with_radius(1.0);

    c.apply(&mut body);
    assert_relative_eq!(body.position, NVec3::new(9.0, 0.0, 0.0));

    let once = body.position;
    c.apply(&mut body);
    assert_relative_eq!(body.position, once, epsilon = 1e-12);
}

#[test]
fn spherical_containment_leaves_inside_bodies_alone() {
    let c = SphericalContainment {
        center: NVec3::new(1.0, 1.0, 1.0),
        radius: 10.0,
    };
    let mut body = Body::new(NVec3::new(4.0, 5.0, 1.0), 1.0).with_radius(2.0);
    let before = body.clone();
    c.apply(&mut body);
    c.apply(&mut body);
    assert_eq!(body, before);
}

#[test]
fn box_clamp_works_per_axis() {
    let c = BoxClamp {
        min: NVec3::new(0.0, 0.0, 0.0),
        max: NVec3::new(10.0, 10.0, 10.0),
    };
    let mut body = Body::new(NVec3::new(-3.0, 5.0, 12.0), 1.0).with_radius(0.5);
    c.apply(&mut body);
    assert_eq!(body.position, NVec3::new(0.5, 5.0, 9.5));
}

#[test]
fn function_constraint_runs_after_collisions() {
    let mut solver = test_solver(10, 1).with_constraint(FnConstraint::new(|b| {
        if b.position.y < 0.0 {
            let p = NVec3::new(b.position.x, 0.0, b.position.z);
            b.set_position(p);
        }
    }));
    let mut bodies = vec![Body::new(NVec3::new(1.0, 0.0, 0.0), 1.0)];
    bodies[0].set_velocity(NVec3::new(0.0, -10.0, 0.0), solver.dt());

    solver.compute(&mut bodies, None);
    assert_eq!(bodies[0].position, NVec3::new(1.0, 0.0, 0.0));
}

#[test]
fn constraints_skip_fixed_bodies() {
    let mut solver = test_solver(10, 1).with_constraint(SphericalContainment {
        center: NVec3::zeros(),
        radius: 1.0,
    });
    let mut bodies = vec![Body::fixed(NVec3::new(5.0, 0.0, 0.0), 1.0)];
    solver.compute(&mut bodies, None);
    assert_eq!(bodies[0].position, NVec3::new(5.0, 0.0, 0.0));
}

// ==================================================================================
// Field tests
// ==================================================================================

#[test]
fn point_source_gate_switches_off_within_epsilon() {
    let field = PointSource::new(NVec3::zeros(), |_, _| NVec3::new(1.0, 0.0, 0.0)).with_epsilon(0.1);

    for (d, expected) in [(0.5, 1.0), (0.2, 1.0), (0.1, 0.0), (0.05, 0.0), (0.0, 0.0)] {
        let bodies = vec![Body::new(NVec3::new(d, 0.0, 0.0), 1.0)];
        let target = Target::new(0, &bodies);
        assert_eq!(field.interact(&target), expected > 0.0, "distance {d}");
        assert_eq!(field.contribution(&target, 0.1).norm(), expected, "distance {d}");
    }
}

#[test]
fn force_reads_the_target_body() {
    let drag = Force::new(|b: &Body, dt: f64| -b.velocity(dt));
    let mut body = Body::new(NVec3::zeros(), 1.0);
    body.set_velocity(NVec3::new(2.0, 0.0, 0.0), 0.5);
    let bodies = vec![body];

    let target = Target::new(0, &bodies);
    assert!(drag.interact(&target));
    assert_relative_eq!(drag.contribution(&target, 0.5), NVec3::new(-2.0, 0.0, 0.0));
}

#[test]
fn gravity_points_toward_source_and_ignores_self() {
    let bodies = vec![
        Body::fixed(NVec3::zeros(), 4.0),
        Body::new(NVec3::new(2.0, 0.0, 0.0), 1.0),
    ];
    let field = UniversalGravity::new(0, 1.0);

    let a = field.contribution(&Target::new(1, &bodies), 0.1);
    assert_relative_eq!(a, NVec3::new(-1.0, 0.0, 0.0));

    assert!(!field.interact(&Target::new(0, &bodies)));
    assert_eq!(field.contribution(&Target::new(0, &bodies), 0.1), NVec3::zeros());
}

#[test]
fn electrostatic_repels_like_charges() {
    let bodies = vec![
        Body::fixed(NVec3::zeros(), 1.0).with_charge(2.0),
        Body::new(NVec3::new(1.0, 0.0, 0.0), 2.0).with_charge(1.0),
        Body::new(NVec3::new(0.0, 1.0, 0.0), 1.0),
    ];
    let field = Electrostatic::new(0, 1.0);

    assert_relative_eq!(field.contribution(&Target::new(1, &bodies), 0.1), NVec3::new(1.0, 0.0, 0.0));
    // uncharged target
    assert_eq!(field.contribution(&Target::new(2, &bodies), 0.1), NVec3::zeros());
}

#[test]
fn harmonic_motion_respects_axes() {
    let bodies = vec![Body::new(NVec3::new(1.0, 1.0, 1.0), 1.0)];
    let target = Target::new(0, &bodies);

    let y_only = HarmonicMotion::along(NVec3::zeros(), 2.0, 1);
    assert_eq!(y_only.contribution(&target, 0.1), NVec3::new(0.0, -2.0, 0.0));

    let all = HarmonicMotion::new(NVec3::zeros(), 2.0);
    assert_eq!(all.contribution(&target, 0.1), NVec3::new(-2.0, -2.0, -2.0));
}

#[test]
fn cyclic_motion_is_zero_at_its_centre() {
    let field = CyclicMotion {
        center: NVec3::new(1.0, 1.0, 0.0),
        frequency: 1.0,
        radius: 0.5,
    };
    let bodies = vec![Body::new(NVec3::new(1.0, 1.0, 0.0), 1.0)];
    assert_eq!(field.contribution(&Target::new(0, &bodies), 0.1), NVec3::zeros());
}

// ==================================================================================
// End-to-end tests
// ==================================================================================

#[test]
fn orbits_close_after_one_period() {
    let ticks_per_second = 100;
    let mut solver = test_solver(ticks_per_second, 1);
    let dt = solver.dt();

    let mut bodies = vec![
        Body::new(NVec3::new(30.0, 50.0, 0.0), 1.0),
        Body::new(NVec3::new(50.0, 50.0, 0.0), 2.0),
    ];
    let slow = CyclicMotion::start(&mut bodies[0], NVec3::new(30.0, 50.0, 0.0), 0.5, 0.5, true, dt);
    let fast = CyclicMotion::start(&mut bodies[1], NVec3::new(50.0, 50.0, 0.0), 1.0, 0.5, false, dt);
    let slow_ticks = (slow.period() * ticks_per_second as f64).round() as usize;
    let fast_ticks = (fast.period() * ticks_per_second as f64).round() as usize;
    let start: Vec<NVec3> = bodies.iter().map(|b| b.position).collect();

    let mut per_object = PerObjectFields::new();
    per_object.insert(0, FieldSet::new().with(slow));
    per_object.insert(1, FieldSet::new().with(fast));

    for tick in 1..=slow_ticks {
        solver.compute(&mut bodies, Some(&per_object));

        // stays on its circle the whole way
        assert_abs_diff_eq!((bodies[0].position - NVec3::new(30.0, 50.0, 0.0)).norm(), 0.5, epsilon = 1e-3);

        if tick == fast_ticks {
            assert_abs_diff_eq!(bodies[1].position, start[1], epsilon = 1e-2);
            // half a turn for the slow one
            assert_abs_diff_eq!(bodies[0].position, NVec3::new(30.0, 49.5, 0.0), epsilon = 1e-2);
        }
    }
    assert_abs_diff_eq!(bodies[0].position, start[0], epsilon = 1e-2);
    assert_abs_diff_eq!(bodies[1].position, start[1], epsilon = 1e-2);
}

#[test]
fn falling_balls_stay_in_the_pit() {
    let mut solver = test_solver(20, 3)
        .with_field(UniformForce {
            acceleration: NVec3::new(0.0, -9.8, 0.0),
        })
        .with_constraint(SphericalContainment {
            center: NVec3::new(50.0, 50.0, 0.0),
            radius: 50.0,
        });
    let mut bodies: Vec<Body> = (0..20)
        .map(|i| {
            let i_f = i as f64;
            Body::new(NVec3::new(30.0 + i_f * 2.0, 80.0 + (i % 3) as f64, 0.0), 1.0).with_radius(1.5)
        })
        .collect();

    for _ in 0..200 {
        solver.compute(&mut bodies, None);
    }

    for b in &bodies {
        assert!(b.position.iter().all(|c| c.is_finite()));
        assert!((b.position - NVec3::new(50.0, 50.0, 0.0)).norm() + 1.5 <= 50.0 + 1e-9);
    }
}

// ==================================================================================
// Scenario tests
// ==================================================================================

const ORBIT_YAML: &str = r#"
solver:
  ticks_per_second: 100
  collision_per_tick: 2
  response: "elastic"
  coulomb_constant: 1.0
run:
  ticks: 10
bodies:
  - x: [30.0, 50.0, 0.0]
    m: 1.0
    orbit: { frequency: 0.5, radius: 0.5 }
  - x: [0.0, 0.0, 0.0]
    m: 5.0
    radius: 1.0
    charge: 1.0
    fixed: true
  - x: [3.0, 0.0, 0.0]
    v: [1.0, 0.0, 0.0]
    m: 1.0
    radius: 1.0
    charge: 1.0
    chain_next: 0
fields:
  - electric: { source: 1 }
constraints:
  - box: { min: [-100.0, -100.0, -100.0], max: [100.0, 100.0, 100.0] }
"#;

#[test]
fn scenario_builds_from_yaml() {
    let cfg: ScenarioConfig = serde_yaml::from_str(ORBIT_YAML).unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();

    assert_eq!(scenario.bodies.len(), 3);
    assert_eq!(scenario.solver.parameters().response, CollisionResponse::Elastic);
    assert!(scenario.per_object.contains_key(&0));
    assert_eq!(scenario.bodies[0].position, NVec3::new(30.0, 50.5, 0.0));
    assert_eq!(scenario.bodies[2].chain.and_then(|c| c.next), Some(0));
    assert_relative_eq!(scenario.bodies[2].velocity(0.01), NVec3::new(1.0, 0.0, 0.0), epsilon = 1e-9);

    scenario.run();
    assert_eq!(scenario.tick, 10);
    assert_eq!(scenario.bodies[1].position, NVec3::zeros());
    // pushed away by the like charge
    assert!(scenario.bodies[2].position.x > 3.1);
}

#[test]
fn scenario_rejects_bad_indices() {
    let mut cfg: ScenarioConfig = serde_yaml::from_str(ORBIT_YAML).unwrap();
    cfg.bodies[2].chain_next = Some(9);
    assert!(matches!(
        Scenario::build_scenario(cfg),
        Err(ScenarioError::InvalidChain { body: 2, next: 9, len: 3 })
    ));

    let yaml = ORBIT_YAML.replace("source: 1", "source: 3");
    let cfg: ScenarioConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(matches!(
        Scenario::build_scenario(cfg),
        Err(ScenarioError::InvalidSource { index: 3, len: 3 })
    ));
}

#[test]
fn zero_tick_rate_is_rejected() {
    assert_eq!(
        Solver::new(Parameters::new(0, 1)).err(),
        Some(SolverError::ZeroTickRate)
    );

    let yaml = ORBIT_YAML.replace("ticks_per_second: 100", "ticks_per_second: 0");
    let cfg: ScenarioConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(matches!(
        Scenario::build_scenario(cfg),
        Err(ScenarioError::Solver(SolverError::ZeroTickRate))
    ));
}
