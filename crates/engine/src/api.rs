//! Public API types for the search driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rooks_search::{Grid, Job};

/// What the driver does once the worker is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Let the job run to completion.
    Complete,
    /// Ask for the job list once after the given delay, then stop.
    Harvest(Duration),
}

/// Configuration for a [`crate::Driver`].
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Side of the cube (1..=64).
    pub size: usize,

    /// Only placements with more rooks than this are reported.
    pub initial_guess: u32,

    /// How often to ask the worker for a snapshot. `None` disables monitoring.
    pub monitor_interval: Option<Duration>,

    /// Sleep between two passes of the driver loop, and the timed-wait period
    /// of both channels.
    pub poll_interval: Duration,

    /// Run to completion or harvest.
    pub mode: RunMode,
}

impl DriverConfig {
    /// Default snapshot cadence.
    pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(1);

    /// Default polling period.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Configuration with the default cadences for a full run.
    pub fn new(size: usize, initial_guess: u32) -> Self {
        Self {
            size,
            initial_guess,
            monitor_interval: Some(Self::DEFAULT_MONITOR_INTERVAL),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            mode: RunMode::Complete,
        }
    }

    /// Replace zero durations with their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.poll_interval.is_zero() {
            self.poll_interval = Self::DEFAULT_POLL_INTERVAL;
        }
        if self.monitor_interval.is_some_and(|d| d.is_zero()) {
            self.monitor_interval = Some(Self::DEFAULT_MONITOR_INTERVAL);
        }
        self
    }
}

/// Callbacks invoked on the driver thread.
pub trait DriverHooks {
    /// A snapshot of the worker's state arrived.
    fn monitor(&mut self, grid: &Grid) {
        let _ = grid;
    }

    /// The worker found a placement with `value` rooks.
    fn optimum(&mut self, grid: &Grid, value: u32) {
        let _ = (grid, value);
    }
}

impl DriverHooks for () {}

/// What a driver run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Best rook count known at the end (at least the initial guess).
    pub optimum: u32,
    /// Grid of the last reported improvement.
    pub best: Option<Grid>,
    /// Jobs handed back by a harvest.
    pub jobs: Vec<Job>,
    /// Whether the run was cut short by a stop request.
    pub stopped: bool,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Whether the whole search space of the job was explored.
    pub fn completed(&self) -> bool {
        !self.stopped && self.jobs.is_empty()
    }
}

/// Cloneable flag that asks a running driver to stop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the driver to kill its worker at the next opportunity.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Messages from the driver to a worker.
///
/// Each variant doubles as its own answer: the worker fills in the payload
/// and hands the message back.
#[derive(Debug)]
pub enum Control {
    /// Ask for a copy of the current state.
    Monitor {
        /// Filled by the worker.
        snapshot: Option<Grid>,
    },
    /// Ask the running job to unwind into jobs.
    GetJobs {
        /// Filled by the worker; empty when idle.
        jobs: Vec<Job>,
    },
    /// Terminate the worker.
    Kill,
    /// Share a lower bound found elsewhere.
    RegisterOptimum {
        /// Candidate optimum.
        candidate: u32,
    },
    /// Start a job. Only valid while idle.
    GoToWork {
        /// Taken by the worker.
        job: Option<Job>,
    },
}

/// Messages from a worker to the driver.
#[derive(Debug)]
pub enum Signal {
    /// A better placement was found.
    Optimum {
        /// Rook count.
        value: u32,
        /// The placement; taken by the driver.
        grid: Option<Grid>,
    },
    /// The job ran to completion.
    JobDone,
}
