//! Parallel simulation core for a sparse, toroidal-free Game of Life.
//!
//! Four pieces, leaves first: [`grid`] (a region-quadtree of bitmap
//! buckets), [`change`] (the thread-safe change buffer), [`engine`] (the
//! B3/S23 step/update protocol), and [`queue`] (the worker pool). [`ctx`]
//! wires them into the driver-facing API described in `SPEC_FULL.md` §6.
//!
//! This crate does not parse patterns, draw anything, or pace frames —
//! those are external collaborators. It consumes an initial population as
//! a stream of [`Ctx::set`] writes and drives everything else through
//! [`Ctx::step`] / [`Ctx::wait`] / [`Ctx::update`].

pub mod change;
pub mod config;
pub mod ctx;
pub mod engine;
pub mod error;
pub mod grid;
pub mod queue;

pub use change::{Change, ChangeBuffer};
pub use ctx::Ctx;
pub use engine::Engine;
pub use error::{Error, GridError, QueueError, Result};
pub use grid::Grid;
pub use queue::WorkQueue;
