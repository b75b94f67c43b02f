use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;

use rooks_engine::{Driver, DriverConfig};
use rooks_search::Job;

use crate::format::{format_duration, format_number};

pub const DEFAULT_SPLIT_MS: u64 = 100;

fn quiet_config(size: usize, guess: u32) -> DriverConfig {
    let mut config = DriverConfig::new(size, guess);
    config.monitor_interval = None;
    config
}

pub fn run_benchmark(
    size: usize,
    guess: u32,
    parallel: usize,
    split: Duration,
) -> anyhow::Result<()> {
    let parallel = parallel.max(1);

    println!("Benchmark size: {size}");
    println!("Parallel workers: {}", format_number(parallel as u64));

    let started_at = Instant::now();
    let summary = Driver::new(quiet_config(size, guess))
        .context("configure benchmark")?
        .harvest_after(split)
        .run(&mut ())
        .context("split the search")?;

    let (optimum, jobs) = if summary.completed() {
        (summary.optimum, 0)
    } else {
        let jobs = summary.jobs.len();
        println!(
            "Split after {}: {} jobs",
            format_duration(summary.elapsed),
            format_number(jobs as u64)
        );
        (run_jobs(summary.jobs, summary.optimum, parallel)?, jobs)
    };

    let duration = started_at.elapsed();
    println!("Optimum: {optimum} rooks");
    println!("Duration: {}", format_duration(duration));
    if jobs > 0 {
        println!(
            "Throughput: {:.2} jobs/s",
            jobs as f64 / duration.as_secs_f64()
        );
    }
    Ok(())
}

/// Run every job to completion on `parallel` threads and return the best
/// optimum, at least `floor`.
pub fn run_jobs(jobs: Vec<Job>, floor: u32, parallel: usize) -> anyhow::Result<u32> {
    let task_count = jobs.len();
    let jobs = Arc::new(jobs);
    let next_task = Arc::new(AtomicUsize::new(0));
    let best = Arc::new(AtomicU32::new(floor));

    let mut handles = Vec::with_capacity(parallel);
    for _worker in 0..parallel.clamp(1, task_count.max(1)) {
        let jobs = jobs.clone();
        let next_task = next_task.clone();
        let best = best.clone();

        handles.push(thread::spawn(move || -> anyhow::Result<()> {
            loop {
                let task_idx = next_task.fetch_add(1, Ordering::Relaxed);
                let Some(job) = jobs.get(task_idx) else {
                    break;
                };
                let size = usize::from(job.grid().size());
                // Later jobs start from the best optimum seen so far.
                let floor = best.load(Ordering::Relaxed);
                let report = Driver::from_job(job.clone(), quiet_config(size, floor))
                    .run(&mut ())
                    .with_context(|| format!("benchmark job {task_idx}"))?;
                best.fetch_max(report.optimum, Ordering::Relaxed);
            }
            Ok(())
        }));
    }

    for handle in handles {
        match handle.join() {
            Ok(res) => res?,
            Err(_) => anyhow::bail!("benchmark worker thread panicked"),
        }
    }
    Ok(best.load(Ordering::Relaxed))
}
