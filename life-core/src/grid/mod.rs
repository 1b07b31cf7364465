//! The sparse grid: a region-quadtree of bitmap buckets.
//!
//! See `SPEC_FULL.md` §3/§4.1 for the data model and operation contracts.

mod bucket;
mod quad;

pub use bucket::Bucket;
use quad::Arena;

use crate::config::{Coord, B};
use crate::error::GridError;

pub struct Grid {
    arena: Arena,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    #[inline]
    fn bucket_coord(x: Coord, y: Coord) -> (Coord, Coord) {
        (x / B as Coord, y / B as Coord)
    }

    #[inline]
    fn local_coord(x: Coord, y: Coord) -> (u32, u32) {
        ((x % B as Coord) as u32, (y % B as Coord) as u32)
    }

    /// Read the cell at `(x, y)`. Absent cells (no covering bucket) read 0.
    pub fn get(&self, x: Coord, y: Coord) -> bool {
        let (bx, by) = Self::bucket_coord(x, y);
        let Some(leaf) = self.arena.find_leaf(Arena::ROOT, bx, by) else {
            return false;
        };
        let Some(bi) = self.arena.find_bucket_in_leaf(leaf, bx, by) else {
            return false;
        };
        let (lx, ly) = Self::local_coord(x, y);
        self.arena.nodes[leaf].buckets()[bi].get_local(lx, ly)
    }

    /// Write `v` to the cell at `(x, y)`. A no-op write of 0 to an already
    /// absent cell allocates nothing. Writing 0 that empties a bucket
    /// unlinks and frees it in the same call.
    pub fn set(&mut self, x: Coord, y: Coord, v: bool) -> Result<(), GridError> {
        let (bx, by) = Self::bucket_coord(x, y);
        let leaf = self
            .arena
            .find_leaf(Arena::ROOT, bx, by)
            .ok_or(GridError::Invariant("point outside root bounds"))?;
        let (lx, ly) = Self::local_coord(x, y);

        let (leaf, bi) = match self.arena.find_bucket_in_leaf(leaf, bx, by) {
            Some(bi) => (leaf, bi),
            None => {
                if !v {
                    return Ok(());
                }
                let leaf = self.arena.ensure_capacity(leaf, bx, by)?;
                let bi = self.arena.insert_bucket(leaf, bx, by);
                (leaf, bi)
            }
        };

        self.arena.bucket_mut(leaf, bi).set_local(lx, ly, v);

        if !v && self.arena.bucket_mut(leaf, bi).is_empty() {
            self.arena.remove_bucket(leaf, bi);
        }
        Ok(())
    }

    /// Look up the bucket at bucket-coordinates `(bx, by)`, starting the
    /// tree descent from `hint` (typically the index of a spatially nearby
    /// leaf, e.g. the leaf currently being processed by the engine).
    pub(crate) fn bucket_at(&self, hint: usize, bx: Coord, by: Coord) -> Option<&Bucket> {
        let leaf = self.arena.find_leaf(hint, bx, by)?;
        let bi = self.arena.find_bucket_in_leaf(leaf, bx, by)?;
        Some(&self.arena.nodes[leaf].buckets()[bi])
    }

    /// The total number of buckets in the grid.
    pub fn bucket_count(&self) -> usize {
        self.arena.count(Arena::ROOT)
    }

    /// Every leaf index, discovered by a single-threaded traversal. Each
    /// leaf becomes one task in [`crate::engine::Engine::step`].
    pub(crate) fn leaves(&self) -> Vec<usize> {
        self.arena.leaves()
    }

    pub(crate) fn leaf_buckets(&self, leaf: usize) -> &[Bucket] {
        self.arena.nodes[leaf].buckets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut g = Grid::new();
        assert!(!g.get(10, 10));
        g.set(10, 10, true).unwrap();
        assert!(g.get(10, 10));
        g.set(10, 10, false).unwrap();
        assert!(!g.get(10, 10));
    }

    #[test]
    fn clearing_a_dead_cell_twice_is_a_noop() {
        let mut g = Grid::new();
        g.set(5, 5, false).unwrap();
        g.set(5, 5, false).unwrap();
        assert_eq!(g.bucket_count(), 0);
    }

    #[test]
    fn set_true_then_false_restores_empty_grid() {
        let mut g = Grid::new();
        g.set(7, 7, true).unwrap();
        assert_eq!(g.bucket_count(), 1);
        g.set(7, 7, false).unwrap();
        assert_eq!(g.bucket_count(), 0);
    }

    #[test]
    fn boundary_coordinates() {
        let mut g = Grid::new();
        let max = Coord::MAX;
        g.set(0, 0, true).unwrap();
        g.set(max, max, true).unwrap();
        assert!(g.get(0, 0));
        assert!(g.get(max, max));
        assert!(!g.get(1, 0));
    }

    #[test]
    fn bucket_gc_frees_on_last_clear() {
        let mut g = Grid::new();
        g.set(100, 100, true).unwrap();
        assert_eq!(g.bucket_count(), 1);
        g.set(100, 100, false).unwrap();
        assert_eq!(g.bucket_count(), 0);
        assert!(!g.get(100, 100));
    }

    #[test]
    fn splitting_past_quadsz_buckets_in_one_leaf() {
        let mut g = Grid::new();
        // Five buckets spaced B apart force at least one split (QUADSZ=4).
        for i in 0..5u16 {
            g.set(i * B as u16, 0, true).unwrap();
        }
        assert_eq!(g.bucket_count(), 5);
        for i in 0..5u16 {
            assert!(g.get(i * B as u16, 0));
        }
    }
}
