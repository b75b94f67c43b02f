#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Branch-and-bound search for the largest set of rooks in an N×N×N cube such
//! that no two rooks share two coordinates and no three rooks pairwise share
//! one coordinate on three different axes.
//!
//! A running search can be cut at any pillar into [`Job`]s that together
//! cover what was left, and every job can be shipped as bytes through a
//! [`JobRegistry`].

/// Occupancy lanes.
pub mod bitlane;

mod grid;
mod job;
mod registry;
mod search;
mod wire;

pub use grid::{ConfigurationError, Grid, GridSummary, PlacementError};
pub use job::{Job, JobReport, JobTag, Resume};
pub use registry::{Decoder, JobRegistry};
pub use search::{Checkpoint, Directive, Outcome, Search, SearchStats, Unattended};
pub use wire::{CorruptPayload, WIRE_VERSION};
