#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Threaded runtime for `rooks-search`: a worker thread driving one search at
//! a time, steered through single-slot control channels.

/// Public API for the engine crate.
pub mod api;

mod channel;
mod driver;
mod worker;

pub use api::{Control, DriverConfig, DriverHooks, RunMode, RunSummary, Signal, StopHandle};
pub use channel::{AnswerSide, ChannelError, QuerySide, sync_channel};
pub use driver::Driver;
pub use worker::{Worker, WorkerError};
