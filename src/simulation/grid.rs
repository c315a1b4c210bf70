//! Uniform spatial hash grid used as the collision broad phase.
//!
//! Space is cut into cubes of edge `cell_size`. A value inserted with a radius
//! lands in every cell its sphere overlaps, so a query over a radius only has
//! to look at the cells the query sphere overlaps.
//!
//! Buckets are looked up in two levels: a coarse 64-bit hash of the cell key
//! picks an inner map, and the inner map is keyed by the exact [`CellKey`].
//! Two keys sharing a hash only make the inner map larger.
//!
//! The grid is rebuilt from scratch every tick, it is an index and not storage.

use std::collections::HashMap;
use std::hash::Hash;

use log::warn;

use crate::simulation::params::{SolverError, INITIAL_CELL_SIZE, MAX_FOOTPRINT_SPAN, SHARD_SIZE};
use crate::simulation::states::NVec3;

/// Integer cell coordinates, `floor(axis / cell_size)` per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(pub [i64; 3]);

impl CellKey {
    pub fn offset(&self, dx: i64, dy: i64, dz: i64) -> CellKey {
        let [x, y, z] = self.0;
        CellKey([x + dx, y + dy, z + dz])
    }

    /// Shard containing this cell, shards are `SHARD_SIZE` cells along each axis
    pub fn shard(&self) -> CellKey {
        let [x, y, z] = self.0;
        CellKey([
            x.div_euclid(SHARD_SIZE),
            y.div_euclid(SHARD_SIZE),
            z.div_euclid(SHARD_SIZE),
        ])
    }

    /// Coarse bucket hash: sign bits folded into the top three bits, xor of the
    /// coordinates in the rest
    pub fn coarse_hash(&self) -> u64 {
        let [x, y, z] = self.0;
        let signs = ((x < 0) as u64) | (((y < 0) as u64) << 1) | (((z < 0) as u64) << 2);
        let body = ((x ^ y ^ z) as u64 >> 3) & ((1 << 61) - 1);
        (signs << 61) | body
    }
}

/// Snapshot of non-empty buckets
pub type CellMap<T> = HashMap<CellKey, Vec<T>>;

pub struct SpatialGrid<T> {
    cell_size: f64,
    buckets: HashMap<u64, HashMap<CellKey, Vec<T>>>,
    // removal handles: every cell a value was put into
    handles: HashMap<T, Vec<CellKey>>,
}

impl<T> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self {
            cell_size: INITIAL_CELL_SIZE,
            buckets: HashMap::new(),
            handles: HashMap::new(),
        }
    }
}

impl<T> SpatialGrid<T>
where
    T: Copy + Eq + Hash,
{
    pub fn new(cell_size: f64) -> Result<Self, SolverError> {
        check_cell_size(cell_size)?;
        Ok(Self {
            cell_size,
            buckets: HashMap::new(),
            handles: HashMap::new(),
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Drop all contents and use `cell_size` for every later coordinate
    pub fn resize(&mut self, cell_size: f64) -> Result<(), SolverError> {
        check_cell_size(cell_size)?;
        self.clear();
        self.cell_size = cell_size;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.handles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of distinct values currently indexed
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn cell_of(&self, p: &NVec3) -> CellKey {
        CellKey([
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        ])
    }

    /// Every cell overlapped by the bounding box of the sphere `(center, radius)`,
    /// at most `MAX_FOOTPRINT_SPAN` cells per axis around the centre cell
    pub fn cells_overlapping(&self, center: &NVec3, radius: f64) -> Vec<CellKey> {
        let r = radius.max(0.0);
        let home = self.cell_of(center);
        let mut lo = [0i64; 3];
        let mut hi = [0i64; 3];
        let mut clamped = false;

        for axis in 0..3 {
            let a = ((center[axis] - r) / self.cell_size).floor() as i64;
            let b = ((center[axis] + r) / self.cell_size).floor() as i64;
            if b.saturating_sub(a) >= MAX_FOOTPRINT_SPAN {
                let half = MAX_FOOTPRINT_SPAN / 2;
                lo[axis] = home.0[axis].saturating_sub(half);
                hi[axis] = home.0[axis].saturating_add(half - 1);
                clamped = true;
            } else {
                lo[axis] = a;
                hi[axis] = b;
            }
        }
        if clamped {
            warn!(
                "footprint of radius {r} at cell size {} clamped to {MAX_FOOTPRINT_SPAN} cells per axis",
                self.cell_size
            );
        }

        let span = |axis: usize| (hi[axis] - lo[axis] + 1) as usize;
        let mut cells = Vec::with_capacity(span(0) * span(1) * span(2));
        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    cells.push(CellKey([x, y, z]));
                }
            }
        }
        cells
    }

    /// Insert `value` into every cell overlapped by the sphere.
    /// A previous insertion of the same value is retracted first.
    pub fn put(&mut self, center: &NVec3, radius: f64, value: T) {
        self.remove(&value);

        let cells = self.cells_overlapping(center, radius);
        for cell in &cells {
            self.buckets
                .entry(cell.coarse_hash())
                .or_default()
                .entry(*cell)
                .or_default()
                .push(value);
        }
        self.handles.insert(value, cells);
    }

    /// Retract every insertion of `value`, returns whether it was present
    pub fn remove(&mut self, value: &T) -> bool {
        let Some(cells) = self.handles.remove(value) else {
            return false;
        };
        for cell in cells {
            let hash = cell.coarse_hash();
            let Some(inner) = self.buckets.get_mut(&hash) else {
                continue;
            };
            if let Some(bucket) = inner.get_mut(&cell) {
                if let Some(i) = bucket.iter().position(|v| v == value) {
                    bucket.swap_remove(i);
                }
                if bucket.is_empty() {
                    inner.remove(&cell);
                }
            }
            if inner.is_empty() {
                self.buckets.remove(&hash);
            }
        }
        true
    }

    /// De-duplicated values of every cell overlapped by the query sphere,
    /// in first-seen order
    pub fn get(&self, center: &NVec3, radius: f64) -> Vec<T> {
        let mut out: Vec<T> = Vec::new();
        for cell in self.cells_overlapping(center, radius) {
            let Some(bucket) = self.bucket(&cell) else {
                continue;
            };
            for v in bucket {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
        }
        out
    }

    pub fn bucket(&self, cell: &CellKey) -> Option<&[T]> {
        self.buckets
            .get(&cell.coarse_hash())
            .and_then(|inner| inner.get(cell))
            .map(|v| v.as_slice())
    }

    /// Full snapshot of non-empty buckets
    pub fn all_cells(&self) -> CellMap<T> {
        let mut all = CellMap::new();
        for inner in self.buckets.values() {
            for (cell, values) in inner {
                if values.is_empty() {
                    continue;
                }
                all.entry(*cell).or_insert_with(Vec::new).extend_from_slice(values);
            }
        }
        all
    }
}

/// Group a snapshot into shards, each shard keeps its own cells only
pub fn split_into_shards<T: Clone>(cells: CellMap<T>) -> Vec<(CellKey, CellMap<T>)> {
    let mut shards: HashMap<CellKey, CellMap<T>> = HashMap::new();
    for (cell, values) in cells {
        shards.entry(cell.shard()).or_default().insert(cell, values);
    }
    let mut out: Vec<_> = shards.into_iter().collect();
    // deterministic work order
    out.sort_unstable_by_key(|(key, _)| *key);
    out
}

fn check_cell_size(cell_size: f64) -> Result<(), SolverError> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(SolverError::InvalidCellSize(cell_size))
    }
}
