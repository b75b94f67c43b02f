//! Single-worker orchestration loop.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use rooks_search::{ConfigurationError, Grid, Job};

use crate::api::{Control, DriverConfig, DriverHooks, RunMode, RunSummary, Signal, StopHandle};
use crate::channel::{AnswerSide, ChannelError, QuerySide, sync_channel};
use crate::worker::{Worker, WorkerError};

/// Runs one job on a dedicated worker thread and relays what it reports.
pub struct Driver {
    config: DriverConfig,
    job: Option<Job>,
    stop: StopHandle,
}

impl Driver {
    /// Driver for the whole search described by `config`.
    pub fn new(config: DriverConfig) -> Result<Self, ConfigurationError> {
        let job = Job::initial(config.size, config.initial_guess)?;
        Ok(Self::from_job(job, config))
    }

    /// Driver for an existing job. `config.size` is ignored; the initial
    /// guess is merged into the job's floor.
    pub fn from_job(mut job: Job, config: DriverConfig) -> Self {
        job.raise_floor(config.initial_guess);
        Self {
            config: config.normalized(),
            job: Some(job),
            stop: StopHandle::default(),
        }
    }

    /// Switch to harvest mode: collect the job list once after `delay`.
    pub fn harvest_after(mut self, delay: Duration) -> Self {
        self.config.mode = RunMode::Harvest(delay);
        self
    }

    /// Handle that stops this driver from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the job until it completes, is harvested or is stopped.
    pub fn run<H: DriverHooks>(&mut self, hooks: &mut H) -> anyhow::Result<RunSummary> {
        let job = self.job.take().context("driver already ran its job")?;
        let floor = job.optimum();
        let poll = self.config.poll_interval;

        let (control, control_rx) = sync_channel::<Control>(poll);
        let (signal_tx, signals) = sync_channel::<Signal>(poll);
        let worker = Worker::new(control_rx, signal_tx);
        let handle = thread::Builder::new()
            .name("rooks-worker".to_string())
            .spawn(move || worker.run())
            .context("spawn worker thread")?;
        debug!(tag = %job.tag(), floor, "worker spawned");

        let started = Instant::now();
        let mut session = Session {
            config: &self.config,
            stop: &self.stop,
            control,
            signals,
            started,
            last_monitor: started,
            optimum: floor,
            best: None,
            jobs: Vec::new(),
            stopped: false,
            harvest_sent: false,
            kill_sent: false,
        };

        match session.drive(job, hooks) {
            Ok(()) => {
                join(handle)?;
                Ok(RunSummary {
                    optimum: session.optimum,
                    best: session.best,
                    jobs: session.jobs,
                    stopped: session.stopped,
                    elapsed: started.elapsed(),
                })
            }
            Err(err) => {
                drop(session);
                match handle.join() {
                    Ok(Err(protocol @ WorkerError::Protocol(_))) => {
                        Err(anyhow::Error::new(protocol).context("worker failed"))
                    }
                    Err(_) => Err(anyhow!("worker thread panicked")),
                    Ok(_) => Err(err),
                }
            }
        }
    }
}

fn join(handle: JoinHandle<Result<(), WorkerError>>) -> anyhow::Result<()> {
    match handle.join() {
        Ok(res) => res.context("worker failed"),
        Err(_) => Err(anyhow!("worker thread panicked")),
    }
}

struct Session<'a> {
    config: &'a DriverConfig,
    stop: &'a StopHandle,
    control: QuerySide<Control>,
    signals: AnswerSide<Signal>,
    started: Instant,
    last_monitor: Instant,
    optimum: u32,
    best: Option<Grid>,
    jobs: Vec<Job>,
    stopped: bool,
    harvest_sent: bool,
    kill_sent: bool,
}

impl Session<'_> {
    fn drive<H: DriverHooks>(&mut self, job: Job, hooks: &mut H) -> anyhow::Result<()> {
        self.control
            .query(Control::GoToWork { job: Some(job) })
            .context("submit job")?;
        self.control.wait_answer().context("wait for job acceptance")?;

        loop {
            if self.control.is_pending() {
                if let Some(answer) = self.control.try_answer().context("poll control")? {
                    if self.on_answer(answer, hooks) {
                        return Ok(());
                    }
                }
            } else {
                self.issue()?;
            }

            let signal = match self.signals.try_query() {
                Ok(signal) => signal,
                // The worker exits right after acknowledging a kill.
                Err(ChannelError::Disconnected) if self.kill_sent => None,
                Err(err) => return Err(err).context("poll signals"),
            };
            if let Some(signal) = signal {
                match signal {
                    Signal::Optimum { value, grid } => {
                        self.optimum = self.optimum.max(value);
                        if let Some(grid) = &grid {
                            hooks.optimum(grid, value);
                        }
                        self.best = grid.or(self.best.take());
                        self.signals
                            .answer(Signal::Optimum { value, grid: None })
                            .context("acknowledge optimum")?;
                    }
                    Signal::JobDone => {
                        self.signals.answer(Signal::JobDone).context("acknowledge job done")?;
                        debug!(elapsed = ?self.started.elapsed(), "job done");
                        self.finish(hooks)?;
                        return Ok(());
                    }
                }
            }

            thread::sleep(self.config.poll_interval);
        }
    }

    /// Handle a control answer. Returns `true` once the worker is gone.
    fn on_answer<H: DriverHooks>(&mut self, answer: Control, hooks: &mut H) -> bool {
        match answer {
            Control::Monitor { snapshot } => {
                if let Some(grid) = snapshot {
                    hooks.monitor(&grid);
                }
                false
            }
            Control::GetJobs { jobs } => {
                info!(jobs = jobs.len(), "harvested running job");
                self.jobs = jobs;
                false
            }
            Control::Kill => true,
            Control::RegisterOptimum { .. } | Control::GoToWork { .. } => false,
        }
    }

    /// Issue the next control query, if one is due. The slot is free.
    fn issue(&mut self) -> anyhow::Result<()> {
        if self.kill_sent {
            return Ok(());
        }
        let msg = if self.stop.is_stop_requested() {
            info!("stop requested; killing worker");
            self.stopped = true;
            self.kill_sent = true;
            Control::Kill
        } else if self.harvest_sent {
            // The harvest was answered and the worker is idle again.
            self.kill_sent = true;
            Control::Kill
        } else if self.harvest_due() {
            info!("requesting job list");
            self.harvest_sent = true;
            Control::GetJobs { jobs: Vec::new() }
        } else if self.monitor_due() {
            self.last_monitor = Instant::now();
            Control::Monitor { snapshot: None }
        } else {
            return Ok(());
        };
        self.control.query(msg).context("send control")
    }

    fn harvest_due(&self) -> bool {
        match self.config.mode {
            RunMode::Harvest(delay) => !self.harvest_sent && self.started.elapsed() >= delay,
            RunMode::Complete => false,
        }
    }

    fn monitor_due(&self) -> bool {
        self.config
            .monitor_interval
            .is_some_and(|every| self.last_monitor.elapsed() >= every)
    }

    /// The job is done: drain the slot, then kill the idle worker.
    fn finish<H: DriverHooks>(&mut self, hooks: &mut H) -> anyhow::Result<()> {
        if self.control.is_pending() {
            let answer = self.control.wait_answer().context("drain control")?;
            if self.on_answer(answer, hooks) {
                return Ok(());
            }
        }
        self.control.query(Control::Kill).context("send kill")?;
        self.kill_sent = true;
        match self.control.wait_answer().context("wait for kill")? {
            Control::Kill => Ok(()),
            other => Err(anyhow!("unexpected answer to kill: {other:?}")),
        }
    }
}
