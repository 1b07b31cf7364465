//! The simulation engine: computes one generation's flips (B3/S23) from a
//! read-only grid snapshot, in parallel across leaves, via the work queue.

use std::sync::Arc;

use log::trace;

use crate::change::ChangeBuffer;
use crate::config::{abs_coord, wrap_bucket, B};
#[cfg(test)]
use crate::config::Coord;
use crate::grid::{Bucket, Grid};
use crate::queue::WorkQueue;

/// The eight Moore-neighborhood bucket directions, used to pre-fetch the
/// neighbor buckets a leaf's work needs once per bucket rather than once
/// per cell.
const DIRS: [(i32, i32); 8] = [
    (0, -1),  // N
    (1, -1),  // NE
    (1, 0),   // E
    (1, 1),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // W
    (-1, -1), // NW
];

/// The current bucket plus its 8 Moore neighbors, fetched once. Evaluating
/// any cell within a 2-cell radius of the bucket only ever needs one of
/// these nine references: a phantom bucket's own border (the only part of
/// it that can ever be born, see `SPEC_FULL.md` §4.3 step 5) always
/// resolves to one of the original eight neighbor slots, never a second
/// ring, because B >= 2.
struct Neighborhood<'g> {
    center: &'g Bucket,
    around: [Option<&'g Bucket>; 8],
}

impl<'g> Neighborhood<'g> {
    fn fetch(grid: &'g Grid, hint: usize, center: &'g Bucket) -> Self {
        let (bx, by) = center.pos();
        let mut around = [None; 8];
        for (i, (dx, dy)) in DIRS.iter().enumerate() {
            let nx = wrap_bucket(bx, *dx);
            let ny = wrap_bucket(by, *dy);
            around[i] = grid.bucket_at(hint, nx, ny);
        }
        Self { center, around }
    }

    /// Is the cell at `(cx, cy)` (an offset in cells relative to the
    /// bucket's own origin, in `[-2, B+1]`) alive? Interior offsets read
    /// `center` directly; anything else resolves to one of the 8
    /// pre-fetched neighbors, or dead if that neighbor is absent.
    fn live_at(&self, cx: i32, cy: i32) -> bool {
        let bsz = B as i32;
        let dx = cx.div_euclid(bsz);
        let dy = cy.div_euclid(bsz);
        let lx = cx.rem_euclid(bsz) as u32;
        let ly = cy.rem_euclid(bsz) as u32;
        let bucket = match (dx, dy) {
            (0, 0) => Some(self.center),
            (0, -1) => self.around[0],
            (1, -1) => self.around[1],
            (1, 0) => self.around[2],
            (1, 1) => self.around[3],
            (0, 1) => self.around[4],
            (-1, 1) => self.around[5],
            (-1, 0) => self.around[6],
            (-1, -1) => self.around[7],
            _ => unreachable!("offsets never resolve more than one bucket away"),
        };
        bucket.is_some_and(|b| b.get_local(lx, ly))
    }
}

/// Count live Moore neighbors of the cell at offset `(cx, cy)`.
fn live_neighbors(nh: &Neighborhood, cx: i32, cy: i32) -> u8 {
    let mut n = 0u8;
    for (dx, dy) in DIRS {
        if nh.live_at(cx + dx, cy + dy) {
            n += 1;
        }
    }
    n
}

/// B3/S23: birth on exactly 3 neighbors, survive on 2 or 3, otherwise die.
#[inline]
fn next_state(alive: bool, neighbors: u8) -> bool {
    if alive {
        neighbors == 2 || neighbors == 3
    } else {
        neighbors == 3
    }
}

/// Process one bucket: every cell inside it plus its one-cell border
/// (`(B+2)^2` cells total), emitting a flip for each cell whose state
/// changes. This single window covers the distilled spec's interior / edge
/// / corner / phantom-bucket cases uniformly — all of them reduce to
/// `Neighborhood::live_at`, so there's no separate phantom pass.
fn bucket_step(grid: &Grid, hint: usize, bucket: &Bucket, changes: &ChangeBuffer) {
    let (bx, by) = bucket.pos();
    let nh = Neighborhood::fetch(grid, hint, bucket);
    for ly in -1..=(B as i32) {
        for lx in -1..=(B as i32) {
            let alive = nh.live_at(lx, ly);
            let n = live_neighbors(&nh, lx, ly);
            let next = next_state(alive, n);
            if next != alive {
                let x = abs_coord(bx, lx);
                let y = abs_coord(by, ly);
                changes.append(x, y, next);
            }
        }
    }
}

/// A read-only-grid reference implementation used only to differentially
/// test the optimized `bucket_step` above: re-derives every neighbor via a
/// full `Grid::get` call, the way the original C `bucket_step` does, rather
/// than pre-fetching neighbor buckets.
#[cfg(test)]
pub(crate) fn reference_bucket_step(grid: &Grid, bx: Coord, by: Coord, changes: &ChangeBuffer) {
    for ly in -1..=(B as i32) {
        for lx in -1..=(B as i32) {
            let x = abs_coord(bx, lx);
            let y = abs_coord(by, ly);
            let alive = grid.get(x, y);
            let mut n = 0u8;
            for (dx, dy) in DIRS {
                let nx = abs_coord(bx, lx + dx);
                let ny = abs_coord(by, ly + dy);
                if grid.get(nx, ny) {
                    n += 1;
                }
            }
            let next = next_state(alive, n);
            if next != alive {
                changes.append(x, y, next);
            }
        }
    }
}

/// Computes the next generation by dispatching one task per quadtree leaf.
pub struct Engine;

impl Engine {
    /// Submit one task per leaf to `queue`; each task evaluates every
    /// bucket in its leaf and appends flips to `changes`. Returns once all
    /// tasks are *submitted* — the caller must still call
    /// `queue.wait()` before reading `changes`.
    pub fn step(grid: Arc<Grid>, changes: Arc<ChangeBuffer>, queue: &WorkQueue) {
        let leaves = grid.leaves();
        trace!("engine: dispatching {} leaf tasks", leaves.len());
        for leaf in leaves {
            let grid = Arc::clone(&grid);
            let changes = Arc::clone(&changes);
            queue.add(Box::new(move |run| {
                if !run {
                    return;
                }
                for bucket in grid.leaf_buckets(leaf) {
                    bucket_step(&grid, leaf, bucket, &changes);
                }
            }));
        }
    }

    /// Apply every buffered change to `grid` in buffer order. Order is
    /// irrelevant for correctness (the flip set is a pure function of the
    /// pre-step grid), but applying in recorded order is the simplest
    /// faithful translation of the source's `update`.
    pub fn update(grid: &mut Grid, changes: &ChangeBuffer) -> Result<(), crate::error::GridError> {
        for change in changes.iterate() {
            grid.set(change.x, change.y, change.v)?;
        }
        Ok(())
    }
}
