//! State module for harvest progress tracking
//!
//! This module provides the two kinds of state the harvest loop maintains:
//!
//! - `SharedCounters`: in-memory cumulative counters (pages, records,
//!   errors), shared across workers behind a mutex
//! - `Checkpoint`: the durable progress snapshot written to disk so an
//!   interrupted run can resume where it stopped

mod checkpoint;
mod counters;

// Re-export main types
pub use checkpoint::{clear_checkpoint, load_checkpoint, save_checkpoint, Checkpoint, StateError};
pub use counters::{HarvestCounters, SharedCounters};
