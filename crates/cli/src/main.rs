mod bench;
mod cli;
mod format;
mod jobs;
mod logging;
mod shutdown;
mod ui;

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};

use rooks_engine::{Driver, DriverConfig, DriverHooks, RunSummary};
use rooks_search::{Grid, Job, JobRegistry};

use crate::bench::{DEFAULT_SPLIT_MS, run_benchmark};
use crate::cli::Cli;
use crate::format::{Event, format_duration, format_grid_block, format_optimum_line, now};
use crate::shutdown::{ShutdownController, ShutdownEvent, spawn_ctrl_c_handler};
use crate::ui::Ui;

const STOP_MESSAGE: &str =
    "Stop requested, killing the worker (press CTRL+C again to exit immediately).";

/// What the driver thread reports to the async side.
enum Report {
    Monitor(Grid),
    Optimum(Grid, u32),
}

struct ChannelHooks {
    tx: mpsc::UnboundedSender<Report>,
}

impl DriverHooks for ChannelHooks {
    fn monitor(&mut self, grid: &Grid) {
        let _ = self.tx.send(Report::Monitor(grid.clone()));
    }

    fn optimum(&mut self, grid: &Grid, value: u32) {
        let _ = self.tx.send(Report::Optimum(grid.clone(), value));
    }
}

struct Output {
    json: bool,
    ui: Option<Ui>,
}

impl Output {
    fn text(&self, msg: &str) {
        match &self.ui {
            Some(ui) => ui.println(msg),
            None => println!("{msg}"),
        }
    }

    fn event(&self, event: Event) {
        println!("{}", event.to_line());
    }

    fn notice(&self, msg: &str) {
        match &self.ui {
            Some(ui) => ui.set_stop_message(msg),
            None => eprintln!("{msg}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    if let Some(parallel) = cli.bench_parallel() {
        let split = Duration::from_millis(cli.export_after_ms.unwrap_or(DEFAULT_SPLIT_MS));
        let (size, guess) = (usize::from(cli.size), cli.guess);
        return tokio::task::spawn_blocking(move || run_benchmark(size, guess, parallel, split))
            .await
            .context("benchmark task")?;
    }

    let registry = JobRegistry::standard();
    let job = match cli.resume.as_deref() {
        Some(line) => jobs::decode_line(&registry, line)?,
        None => Job::initial(usize::from(cli.size), cli.guess).context("configure search")?,
    };
    let size = job.grid().size();
    let tag = job.tag().to_string();
    info!(size, tag = %tag, floor = job.optimum(), "starting search");

    let mut config = DriverConfig::new(usize::from(size), cli.guess);
    config.monitor_interval = (!cli.no_monitor).then(|| Duration::from_millis(cli.monitor_ms));
    let mut driver = Driver::from_job(job, config);
    if let Some(ms) = cli.export_after_ms {
        driver = driver.harvest_after(Duration::from_millis(ms));
    }
    let stop = driver.stop_handle();

    let (report_tx, mut reports) = mpsc::unbounded_channel::<Report>();
    let run = tokio::task::spawn_blocking(move || {
        let mut hooks = ChannelHooks { tx: report_tx };
        driver.run(&mut hooks)
    });

    let shutdown = Arc::new(ShutdownController::new());
    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<ShutdownEvent>();
    spawn_ctrl_c_handler(shutdown, shutdown_tx);

    let ui_enabled = !cli.json && std::io::stdout().is_terminal();
    let out = Output {
        json: cli.json,
        ui: ui_enabled.then(|| Ui::new(size)),
    };

    if out.json {
        out.event(Event::Started {
            at: now(),
            size,
            guess: cli.guess,
            tag,
        });
    } else {
        out.text(&format!(
            "rooks {} size={size} guess={} job={tag}",
            env!("CARGO_PKG_VERSION"),
            cli.guess
        ));
    }

    let started = Instant::now();
    let mut best: Option<(u32, Grid)> = None;
    let mut current: Option<u32> = None;
    let mut monitors: u64 = 0;

    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut shutdown_open = true;
    let mut immediate_exit = false;

    loop {
        tokio::select! {
            ev_opt = shutdown_rx.recv(), if shutdown_open => {
                match ev_opt {
                    Some(ShutdownEvent::Graceful) => {
                        if out.json {
                            out.event(Event::StopRequested { at: now() });
                        } else {
                            out.notice(STOP_MESSAGE);
                        }
                        stop.request_stop();
                    }
                    Some(ShutdownEvent::Immediate) => {
                        out.notice("Stop requested again, exiting immediately.");
                        immediate_exit = true;
                        break;
                    }
                    None => shutdown_open = false,
                }
            }
            _ = ticker.tick(), if out.ui.is_some() => {
                if let Some(ui) = &out.ui {
                    let value = best.as_ref().map_or(cli.guess, |(value, _)| *value);
                    ui.set_status(value, current, started.elapsed());
                }
            }
            report = reports.recv() => {
                let Some(report) = report else {
                    // The hooks are gone: the driver returned.
                    break;
                };
                match report {
                    Report::Monitor(grid) => {
                        monitors += 1;
                        current = Some(grid.rook_count());
                        if out.json {
                            out.event(Event::Monitor { at: now(), grid: grid.summary() });
                        } else if out.ui.is_none() {
                            out.text(&format_grid_block("Current state:", &grid));
                        }
                        if cli.reminder > 0 && monitors % u64::from(cli.reminder) == 0 {
                            if let Some((_, best_grid)) = &best {
                                if out.json {
                                    out.event(Event::Reminder {
                                        at: now(),
                                        grid: best_grid.summary(),
                                    });
                                } else {
                                    out.text(&format_grid_block(
                                        "Reminder, best so far:",
                                        best_grid,
                                    ));
                                }
                            }
                        }
                    }
                    Report::Optimum(grid, value) => {
                        debug!(value, "optimum reported");
                        if out.json {
                            out.event(Event::Optimum {
                                at: now(),
                                value,
                                grid: grid.summary(),
                            });
                        } else {
                            out.text(&format_grid_block(
                                &format_optimum_line(value, started.elapsed()),
                                &grid,
                            ));
                        }
                        best = Some((value, grid));
                    }
                }
            }
        }
    }

    if let Some(ui) = &out.ui {
        ui.freeze();
    }

    if immediate_exit {
        std::process::exit(130);
    }

    let summary = run.await.context("driver task")??;
    print_summary(&out, &registry, &summary, cli.guess);
    Ok(())
}

fn print_summary(out: &Output, registry: &JobRegistry, summary: &RunSummary, guess: u32) {
    let lines: Vec<String> = summary
        .jobs
        .iter()
        .map(|job| jobs::encode_line(registry, job))
        .collect();

    if out.json {
        out.event(Event::Finished {
            at: now(),
            optimum: summary.optimum,
            completed: summary.completed(),
            stopped: summary.stopped,
            elapsed_ms: u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
            best: summary.best.as_ref().map(Grid::summary),
            jobs: lines,
        });
        return;
    }

    match &summary.best {
        Some(grid) => println!("{}", format_grid_block("Best grid found:", grid)),
        None if summary.stopped => {
            println!("No placement above {guess} rooks found before the stop.")
        }
        None => println!("No optimum found. Initial guess was too high."),
    }
    let status = if summary.stopped {
        "stopped"
    } else if summary.completed() {
        "completed"
    } else {
        "split"
    };
    println!(
        "Optimum: {} rooks ({status} after {})",
        summary.optimum,
        format_duration(summary.elapsed)
    );

    if !summary.jobs.is_empty() {
        eprintln!("Exported {} jobs:", lines.len());
        for line in &lines {
            println!("{line}");
        }
    }
}
