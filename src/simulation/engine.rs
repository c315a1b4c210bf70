//! The solver: one call to [`Solver::compute`] is one tick.
//!
//! Rebuild Grid -> Integrate (parallel) -> Resolve Collisions (N - 1 passes)
//! -> Apply Constraints
//!
//! Nothing but the grid's allocation survives between ticks, the grid itself
//! is rebuilt from the bodies every time.

use log::{debug, trace, warn};

use crate::simulation::collision::resolve_collisions;
use crate::simulation::constraints::{BoxedConstraint, Constraint};
use crate::simulation::forces::{Field, FieldSet, PerObjectFields};
use crate::simulation::grid::SpatialGrid;
use crate::simulation::integrator::verlet_integrator;
use crate::simulation::params::{Parameters, SolverError, CELL_SIZE_FACTOR};
use crate::simulation::states::Body;

pub struct Solver {
    parameters: Parameters,
    fields: FieldSet,
    constraints: Vec<BoxedConstraint>,
    grid: Option<SpatialGrid<usize>>,
    auto_resize: bool, // false once a cell size is pinned
}

impl Solver {
    /// Validate the parameters and build a solver with no fields or constraints
    pub fn new(parameters: Parameters) -> Result<Self, SolverError> {
        parameters.validate()?;
        let (grid, auto_resize) = match parameters.grid_cell_size {
            Some(size) => (Some(SpatialGrid::new(size)?), false),
            None => (None, true),
        };
        Ok(Self {
            parameters,
            fields: FieldSet::new(),
            constraints: Vec::new(),
            grid,
            auto_resize,
        })
    }

    /// Add a global field
    pub fn with_field(mut self, field: impl Field + Send + Sync + 'static) -> Self {
        self.fields = self.fields.with(field);
        self
    }

    /// Add a constraint, constraints run in insertion order
    pub fn with_constraint(mut self, constraint: impl Constraint + Send + Sync + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    /// Use `grid` with its cell size pinned, it is never resized
    pub fn with_grid(mut self, grid: SpatialGrid<usize>) -> Self {
        self.grid = Some(grid);
        self.auto_resize = false;
        self
    }

    pub fn fields_mut(&mut self) -> &mut FieldSet {
        &mut self.fields
    }

    pub fn constraints_mut(&mut self) -> &mut Vec<BoxedConstraint> {
        &mut self.constraints
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn dt(&self) -> f64 {
        self.parameters.dt()
    }

    /// Grid as left by the last tick
    pub fn grid(&self) -> Option<&SpatialGrid<usize>> {
        self.grid.as_ref()
    }

    /// Advance `bodies` by one tick in place. `per_object` adds fields to single
    /// bodies for this tick only.
    pub fn compute(&mut self, bodies: &mut [Body], per_object: Option<&PerObjectFields>) {
        let dt = self.parameters.dt();

        self.rebuild_grid(bodies);

        verlet_integrator(bodies, &self.fields, per_object, dt);

        if let Some(grid) = self.grid.as_ref() {
            for pass in 0..self.parameters.collision_passes() {
                let stats = resolve_collisions(bodies, grid, self.parameters.response);
                trace!(
                    "collision pass {}: {} shards, {} contacts, {} bodies moved",
                    pass, stats.shards, stats.contacts, stats.moved
                );
            }
        }

        for c in &self.constraints {
            for b in bodies.iter_mut().filter(|b| b.is_movable()) {
                c.apply(b);
            }
        }

        debug!(
            "tick: {} bodies, {} indexed, cell size {:.3}",
            bodies.len(),
            self.grid.as_ref().map_or(0, |g| g.len()),
            self.grid.as_ref().map_or(0.0, |g| g.cell_size()),
        );
    }

    /// Resize to 1.2x the mean collision radius and re-insert every collider
    fn rebuild_grid(&mut self, bodies: &[Body]) {
        let auto_resize = self.auto_resize;
        let grid = self.grid.get_or_insert_with(SpatialGrid::default);
        grid.clear();

        if auto_resize {
            let (sum, count) = bodies
                .iter()
                .filter_map(|b| b.radius())
                .fold((0.0, 0usize), |(s, n), r| (s + r, n + 1));
            let mean = sum / count as f64;
            if mean.is_finite() && mean > 0.0 {
                if let Err(e) = grid.resize(mean * CELL_SIZE_FACTOR) {
                    warn!("grid resize skipped: {e}");
                }
            } else if count > 0 {
                warn!("grid resize skipped: mean collision radius is {mean}");
            }
        }

        for (i, b) in bodies.iter().enumerate() {
            if let Some(r) = b.radius() {
                grid.put(&b.position, r, i);
            }
        }
    }
}
