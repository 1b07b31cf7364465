//! The simulation context: the root quad, the change buffer, the worker
//! queue, and the generation counter, wired together behind the canonical
//! driver loop described in `SPEC_FULL.md` §6.

use std::sync::Arc;

use log::info;

use crate::change::ChangeBuffer;
use crate::config::Coord;
use crate::engine::Engine;
use crate::error::{Error, GridError, QueueError, Result};
use crate::grid::Grid;
use crate::queue::WorkQueue;

/// Aggregates everything one simulation run needs. Not `Clone`: a driver
/// owns exactly one `Ctx`, as the queue owns real OS threads.
pub struct Ctx {
    grid: Arc<Grid>,
    changes: Arc<ChangeBuffer>,
    queue: WorkQueue,
    generation: u64,
}

impl Default for Ctx {
    fn default() -> Self {
        Self::new()
    }
}

impl Ctx {
    pub fn new() -> Self {
        Self {
            grid: Arc::new(Grid::new()),
            changes: Arc::new(ChangeBuffer::new()),
            queue: WorkQueue::new(),
            generation: 0,
        }
    }

    /// Start the worker pool. Must be called once before the first
    /// `step`; see [`WorkQueue::start`] for the one-shot semantics.
    pub fn start(&self, workers: usize) -> Result<usize> {
        self.queue.start(workers).map_err(Error::from)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read the cell at `(x, y)`. The external observer interface (§6):
    /// renderers call only this plus [`Ctx::changes`].
    pub fn get(&self, x: Coord, y: Coord) -> bool {
        self.grid.get(x, y)
    }

    /// Write the cell at `(x, y)`. The external grid-write interface (§6):
    /// pattern loaders call only this, never touching the change buffer.
    /// Only valid between generations (after `update` returns, before the
    /// next `step`), when the context holds the grid's only reference.
    pub fn set(&mut self, x: Coord, y: Coord, v: bool) -> Result<()> {
        let grid = Arc::get_mut(&mut self.grid)
            .ok_or(GridError::Invariant("set called while a step is in flight"))?;
        grid.set(x, y, v).map_err(Error::from)
    }

    pub fn bucket_count(&self) -> usize {
        self.grid.bucket_count()
    }

    /// The current generation's change buffer. Observers read this after
    /// `update`; an empty buffer means "redraw from scratch via `get`".
    pub fn changes(&self) -> &ChangeBuffer {
        &self.changes
    }

    /// Dispatch one task per leaf onto the queue. Returns once every task
    /// is submitted; the caller must still call [`Ctx::wait`] before the
    /// buffer is safe to read.
    pub fn step(&self) {
        Engine::step(Arc::clone(&self.grid), Arc::clone(&self.changes), &self.queue);
    }

    /// Block until every leaf task from the last `step` has completed.
    pub fn wait(&self) {
        self.queue.wait();
    }

    /// Apply the buffered changes, reset the buffer, and advance the
    /// generation counter. Must only be called after `wait` has returned
    /// for the matching `step`.
    pub fn update(&mut self) -> Result<()> {
        let grid = Arc::get_mut(&mut self.grid)
            .ok_or(GridError::Invariant("update called before queue drained"))?;
        Engine::update(grid, &self.changes)?;
        self.changes.reset();
        self.generation += 1;
        info!("ctx: advanced to generation {}", self.generation);
        Ok(())
    }

    /// The canonical driver loop, one generation: `step → wait → update`.
    pub fn run_generation(&mut self) -> Result<()> {
        self.step();
        self.wait();
        self.update()
    }

    /// Tear down the worker pool. Dropping `Ctx` does this automatically;
    /// exposed for drivers that want to stop early and deterministically.
    pub fn shutdown(&self) -> std::result::Result<(), QueueError> {
        self.queue.destroy();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_loop_runs_a_blinker() {
        let mut ctx = Ctx::new();
        ctx.start(4).unwrap();
        for &(x, y) in &[(20u16, 10u16), (20, 11), (20, 12)] {
            ctx.set(x, y, true).unwrap();
        }
        ctx.run_generation().unwrap();
        assert_eq!(ctx.generation(), 1);
        assert!(ctx.get(19, 11));
        assert!(ctx.get(20, 11));
        assert!(ctx.get(21, 11));
        assert!(!ctx.get(20, 10));
        ctx.run_generation().unwrap();
        assert!(ctx.get(20, 10));
        assert!(ctx.get(20, 11));
        assert!(ctx.get(20, 12));
    }

    #[test]
    fn empty_change_buffer_means_still_life() {
        let mut ctx = Ctx::new();
        ctx.start(2).unwrap();
        for &(x, y) in &[(10u16, 10u16), (11, 10), (10, 11), (11, 11)] {
            ctx.set(x, y, true).unwrap();
        }
        ctx.run_generation().unwrap();
        assert!(ctx.changes().is_empty());
    }
}
