//! Sharded collision resolution over the spatial grid.
//!
//! Broad phase: the grid snapshot is cut into shards of `SHARD_SIZE³` cells,
//! each shard is one rayon task. A shard lists every pair of bodies sharing a
//! cell or sitting in neighbouring cells of its own view. A pair seen by
//! several shards is handed to the first of them in key order, so each pair
//! is resolved exactly once per pass. Pairs no shard sees are missed, shards
//! never reach into each other.
//!
//! Narrow phase: each task tests its pairs for sphere overlap against a local
//! copy of the bodies involved and pushes overlapping ones apart along the
//! contact normal. Tasks return per-body displacements, the join sums them
//! and applies each body's total once.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;

use crate::simulation::grid::{split_into_shards, CellKey, CellMap, SpatialGrid};
use crate::simulation::params::CollisionResponse;
use crate::simulation::states::{try_normalize, Body, NVec3, TranslatedBox};

/// Fallback contact normal for coincident centres
const FALLBACK_NORMAL: [f64; 3] = [1.0, 0.0, 0.0];

/// What one pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub shards: usize,
    pub contacts: usize,
    pub moved: usize,
}

/// Shard-local copy of a colliding body
#[derive(Debug, Clone)]
struct Local {
    position: NVec3,
    last_position: NVec3,
    radius: f64,
    mass: f64,
    movable: bool,
    dirty: bool,
}

impl Local {
    fn from_body(body: &Body) -> Self {
        Self {
            position: body.position,
            last_position: body.last_position(),
            radius: body.radius().unwrap_or(0.0),
            mass: body.mass,
            movable: body.is_movable(),
            dirty: false,
        }
    }

    fn sphere(&self) -> TranslatedBox {
        TranslatedBox {
            radius: self.radius,
            center: self.position,
        }
    }

    /// Velocity as a per-tick displacement
    fn step(&self) -> NVec3 {
        self.position - self.last_position
    }
}

/// Displacement of one body produced by one shard
struct Update {
    index: usize,
    shift: NVec3,
    last_shift: NVec3,
}

type Pair = (usize, usize);

/// Run one sharded resolution pass and apply the result to `bodies`.
/// Grid values are indices into `bodies`.
pub fn resolve_collisions(
    bodies: &mut [Body],
    grid: &SpatialGrid<usize>,
    response: CollisionResponse,
) -> PassStats {
    let shards = split_into_shards(grid.all_cells());
    let snapshot: &[Body] = bodies;

    let seen: Vec<Vec<Pair>> = shards
        .par_iter()
        .map(|(_, cells)| candidate_pairs(cells))
        .collect();

    // shards are sorted, first claim wins
    let mut claimed: HashSet<Pair> = HashSet::new();
    let work: Vec<Vec<Pair>> = seen
        .into_iter()
        .map(|pairs| pairs.into_iter().filter(|p| claimed.insert(*p)).collect())
        .collect();

    let results: Vec<(Vec<Update>, usize)> = work
        .par_iter()
        .map(|pairs| resolve_shard(pairs, snapshot, response))
        .collect();

    let mut stats = PassStats {
        shards: shards.len(),
        ..Default::default()
    };

    // Join: sum every shard's displacements per body
    let mut totals: BTreeMap<usize, (NVec3, NVec3)> = BTreeMap::new();
    for (updates, contacts) in results {
        stats.contacts += contacts;
        for u in updates {
            let total = totals
                .entry(u.index)
                .or_insert_with(|| (NVec3::zeros(), NVec3::zeros()));
            total.0 += u.shift;
            total.1 += u.last_shift;
        }
    }

    let mut drags: Vec<(usize, NVec3)> = Vec::new();
    for (index, (shift, last_shift)) in totals {
        let Some(body) = bodies.get_mut(index) else {
            continue;
        };
        let p = body.position + shift;
        body.set_position(p);
        if let Some(m) = body.motion.as_mut() {
            m.last_position += last_shift;
        }
        stats.moved += 1;
        if let Some(next) = body.chain.and_then(|c| c.next) {
            if next != index {
                drags.push((next, shift));
            }
        }
    }
    propagate_chain(bodies, &drags);
    stats
}

/// One-hop drag: the linked body moves by the same displacement
fn propagate_chain(bodies: &mut [Body], drags: &[(usize, NVec3)]) {
    for (index, delta) in drags {
        if let Some(body) = bodies.get_mut(*index) {
            let p = body.position + delta;
            body.set_position(p);
        }
    }
}

/// Every pair sharing a cell or in neighbouring cells of this view, as
/// `(lower, higher)` index, in cell-key order
fn candidate_pairs(cells: &CellMap<usize>) -> Vec<Pair> {
    let mut keys: Vec<CellKey> = cells.keys().copied().collect();
    keys.sort_unstable();

    let mut seen: HashSet<Pair> = HashSet::new();
    let mut pairs: Vec<Pair> = Vec::new();
    let mut neighbours: Vec<usize> = Vec::new();
    for key in &keys {
        let Some(own) = cells.get(key) else {
            continue;
        };
        neighbours.clear();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(values) = cells.get(&key.offset(dx, dy, dz)) {
                        neighbours.extend_from_slice(values);
                    }
                }
            }
        }

        for &a in own {
            for &b in &neighbours {
                if a == b {
                    continue;
                }
                let pair = (a.min(b), a.max(b));
                if seen.insert(pair) {
                    pairs.push(pair);
                }
            }
        }
    }
    pairs
}

fn resolve_shard(
    pairs: &[Pair],
    bodies: &[Body],
    response: CollisionResponse,
) -> (Vec<Update>, usize) {
    let mut locals: HashMap<usize, Local> = HashMap::new();
    for &(a, b) in pairs {
        for i in [a, b] {
            if let Some(body) = bodies.get(i) {
                locals.entry(i).or_insert_with(|| Local::from_body(body));
            }
        }
    }

    let mut contacts = 0;
    for &(a, b) in pairs {
        if resolve_pair(&mut locals, a, b, response) {
            contacts += 1;
        }
    }

    let mut updates: Vec<Update> = locals
        .into_iter()
        .filter(|(_, l)| l.dirty && l.movable)
        .filter_map(|(index, l)| {
            let body = bodies.get(index)?;
            Some(Update {
                index,
                shift: l.position - body.position,
                last_shift: l.last_position - body.last_position(),
            })
        })
        .collect();
    updates.sort_unstable_by_key(|u| u.index);
    (updates, contacts)
}

/// Separate `a` and `b` if their spheres overlap, returns whether they moved
fn resolve_pair(
    locals: &mut HashMap<usize, Local>,
    a: usize,
    b: usize,
    response: CollisionResponse,
) -> bool {
    let (Some(la), Some(lb)) = (locals.get(&a), locals.get(&b)) else {
        return false;
    };
    if !la.sphere().collided(&lb.sphere()) {
        return false;
    }

    let delta = la.position - lb.position;
    let penetration = la.radius + lb.radius - delta.norm();
    if penetration <= 0.0 {
        return false;
    }

    // share of the correction each side takes
    let (wa, wb) = match (la.movable, lb.movable) {
        (true, true) => (0.5, 0.5),
        (true, false) => (1.0, 0.0),
        (false, true) => (0.0, 1.0),
        (false, false) => return false,
    };

    let normal = try_normalize(delta).unwrap_or_else(|| NVec3::from(FALLBACK_NORMAL));
    let (step_a, step_b) = match response {
        CollisionResponse::Positional => (None, None),
        CollisionResponse::Elastic => {
            let (sa, sb) = elastic_exchange(la, lb, &normal);
            (Some(sa), Some(sb))
        }
    };

    if let Some(la) = locals.get_mut(&a) {
        la.position += normal * (penetration * wa);
        if let Some(s) = step_a {
            la.last_position = la.position - s;
        }
        la.dirty = true;
    }
    if let Some(lb) = locals.get_mut(&b) {
        lb.position -= normal * (penetration * wb);
        if let Some(s) = step_b {
            lb.last_position = lb.position - s;
        }
        lb.dirty = true;
    }
    true
}

/// Post-contact per-tick displacements for an elastic collision along `normal`
/// (pointing from b to a). Fixed bodies act as infinite mass.
fn elastic_exchange(a: &Local, b: &Local, normal: &NVec3) -> (NVec3, NVec3) {
    let ua = if a.movable { a.step() } else { NVec3::zeros() };
    let ub = if b.movable { b.step() } else { NVec3::zeros() };
    let approach = (ua - ub).dot(normal);
    if approach >= 0.0 {
        // already separating
        return (ua, ub);
    }

    let (ka, kb) = match (a.movable, b.movable) {
        (true, false) => (2.0, 0.0),
        (false, true) => (0.0, 2.0),
        _ => {
            let total = a.mass + b.mass;
            if total > 0.0 {
                (2.0 * b.mass / total, 2.0 * a.mass / total)
            } else {
                (1.0, 1.0)
            }
        }
    };
    (ua - normal * (ka * approach), ub + normal * (kb * approach))
}
