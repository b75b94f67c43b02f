//! Worker state machine: idle between jobs, running one search at a time.

use thiserror::Error;
use tracing::{debug, info, warn};

use rooks_search::{Checkpoint, Directive, Grid, Outcome};

use crate::api::{Control, Signal};
use crate::channel::{AnswerSide, ChannelError, QuerySide};

/// Why a worker stopped other than by a kill.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// A channel was misused or the driver went away.
    #[error("worker channel: {0}")]
    Channel(#[from] ChannelError),

    /// The driver broke the message protocol.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}

/// Consumes [`Control`] messages and runs jobs, reporting through [`Signal`]s.
pub struct Worker {
    control: AnswerSide<Control>,
    signals: QuerySide<Signal>,
    floor: u32,
    last_initial: Option<Grid>,
}

impl Worker {
    /// Worker answering `control` and reporting on `signals`.
    pub fn new(control: AnswerSide<Control>, signals: QuerySide<Signal>) -> Self {
        Self {
            control,
            signals,
            floor: 0,
            last_initial: None,
        }
    }

    /// Serve messages until killed.
    pub fn run(mut self) -> Result<(), WorkerError> {
        loop {
            match self.control.wait_query()? {
                Control::Monitor { .. } => {
                    let snapshot = self.last_initial.clone();
                    self.control.answer(Control::Monitor { snapshot })?;
                }
                Control::GetJobs { .. } => {
                    self.control.answer(Control::GetJobs { jobs: Vec::new() })?;
                }
                Control::Kill => {
                    self.control.answer(Control::Kill)?;
                    debug!("worker killed while idle");
                    return Ok(());
                }
                Control::RegisterOptimum { candidate } => {
                    self.floor = self.floor.max(candidate);
                    self.control.answer(Control::RegisterOptimum { candidate })?;
                }
                Control::GoToWork { job } => {
                    let Some(mut job) = job else {
                        warn!("go-to-work without a job");
                        return Err(WorkerError::Protocol("go-to-work without a job"));
                    };
                    job.raise_floor(self.floor);
                    self.last_initial = Some(job.grid().clone());
                    self.control.answer(Control::GoToWork { job: None })?;

                    debug!(tag = %job.tag(), optimum = job.optimum(), "job started");
                    let mut live = Live::new(&self.control, &self.signals);
                    let report = job.run(&mut live);
                    self.floor = self.floor.max(report.optimum);
                    debug!(
                        optimum = report.optimum,
                        polls = report.stats.polls,
                        placements = report.stats.placements,
                        "job stopped"
                    );

                    if let Some(err) = live.failure {
                        return Err(err);
                    }
                    match report.outcome {
                        Outcome::Completed => {
                            self.signals.query(Signal::JobDone)?;
                            self.signals.wait_answer()?;
                        }
                        Outcome::Harvested(jobs) => {
                            debug!(jobs = jobs.len(), "job harvested");
                            self.control.answer(Control::GetJobs { jobs })?;
                        }
                        Outcome::Halted => {
                            debug!("worker killed while running");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// Checkpoint bridging a running search to the worker's channels.
struct Live<'a> {
    control: &'a AnswerSide<Control>,
    signals: &'a QuerySide<Signal>,
    failure: Option<WorkerError>,
}

impl<'a> Live<'a> {
    fn new(control: &'a AnswerSide<Control>, signals: &'a QuerySide<Signal>) -> Self {
        Self {
            control,
            signals,
            failure: None,
        }
    }

    fn fail(&mut self, err: WorkerError) -> Directive {
        self.failure = Some(err);
        Directive::Halt
    }

    fn reply(&mut self, msg: Control) -> Directive {
        match self.control.answer(msg) {
            Ok(()) => Directive::Continue,
            Err(err) => self.fail(err.into()),
        }
    }
}

impl Checkpoint for Live<'_> {
    fn poll(&mut self, grid: &Grid, optimum: &mut u32) -> Directive {
        if !self.control.has_query() {
            return Directive::Continue;
        }
        let msg = match self.control.try_query() {
            Ok(Some(msg)) => msg,
            Ok(None) => return Directive::Continue,
            Err(err) => return self.fail(err.into()),
        };
        match msg {
            Control::Monitor { .. } => self.reply(Control::Monitor {
                snapshot: Some(grid.clone()),
            }),
            // Answered by the worker once the search has unwound.
            Control::GetJobs { .. } => Directive::Harvest,
            Control::Kill => match self.control.answer(Control::Kill) {
                Ok(()) => Directive::Halt,
                Err(err) => self.fail(err.into()),
            },
            Control::RegisterOptimum { candidate } => {
                *optimum = (*optimum).max(candidate);
                self.reply(Control::RegisterOptimum { candidate })
            }
            Control::GoToWork { .. } => {
                warn!("go-to-work received while a job is running");
                self.fail(WorkerError::Protocol("go-to-work while running"))
            }
        }
    }

    fn improved(&mut self, grid: &Grid, optimum: u32) -> Directive {
        info!(optimum, "improved optimum");
        let signal = Signal::Optimum {
            value: optimum,
            grid: Some(grid.clone()),
        };
        if let Err(err) = self.signals.query(signal) {
            return self.fail(err.into());
        }
        match self.signals.wait_answer() {
            Ok(_) => Directive::Continue,
            Err(err) => self.fail(err.into()),
        }
    }
}
