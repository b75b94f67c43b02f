use std::time::Duration;

use rooks_engine::{Driver, DriverConfig, DriverHooks, RunMode, StopHandle};
use rooks_search::{ConfigurationError, Grid};

#[derive(Default)]
struct Record {
    optima: Vec<u32>,
    monitors: usize,
    monitor_sizes: Vec<u8>,
    stop_after: Option<(usize, StopHandle)>,
}

impl DriverHooks for Record {
    fn monitor(&mut self, grid: &Grid) {
        self.monitors += 1;
        self.monitor_sizes.push(grid.size());
        if let Some((after, stop)) = &self.stop_after {
            if self.monitors >= *after {
                stop.request_stop();
            }
        }
    }

    fn optimum(&mut self, grid: &Grid, value: u32) {
        assert_eq!(grid.rook_count(), value);
        self.optima.push(value);
    }
}

fn quiet(size: usize) -> DriverConfig {
    let mut config = DriverConfig::new(size, 0);
    config.monitor_interval = None;
    config
}

#[test]
fn full_run_reports_every_improvement() {
    let mut record = Record::default();
    let summary = Driver::new(quiet(3)).unwrap().run(&mut record).unwrap();
    assert_eq!(summary.optimum, 6);
    assert_eq!(record.optima, vec![3, 6]);
    assert!(summary.completed());
    assert!(!summary.stopped);
    assert_eq!(summary.best.map(|g| g.rook_count()), Some(6));
}

#[test]
fn unit_hooks_are_enough() {
    let summary = Driver::new(quiet(4)).unwrap().run(&mut ()).unwrap();
    assert_eq!(summary.optimum, 9);
}

#[test]
fn oversized_cube_is_rejected() {
    assert!(matches!(
        Driver::new(quiet(65)),
        Err(ConfigurationError::TooLarge(65))
    ));
    assert!(matches!(Driver::new(quiet(0)), Err(ConfigurationError::Empty)));
}

#[test]
fn driver_runs_its_job_once() {
    let mut driver = Driver::new(quiet(2)).unwrap();
    driver.run(&mut ()).unwrap();
    assert!(driver.run(&mut ()).is_err());
}

#[test]
fn monitoring_then_stop() {
    let mut config = DriverConfig::new(8, 0);
    config.monitor_interval = Some(Duration::from_millis(5));
    let mut driver = Driver::new(config).unwrap();
    let mut record = Record {
        stop_after: Some((3, driver.stop_handle())),
        ..Record::default()
    };
    let summary = driver.run(&mut record).unwrap();
    assert!(summary.stopped);
    assert!(!summary.completed());
    assert!(record.monitors >= 3);
    assert!(record.monitor_sizes.iter().all(|&size| size == 8));
    assert!(summary.jobs.is_empty());
}

#[test]
fn stop_before_run_kills_promptly() {
    let mut driver = Driver::new(quiet(8)).unwrap();
    driver.stop_handle().request_stop();
    let summary = driver.run(&mut ()).unwrap();
    assert!(summary.stopped);
}

#[test]
fn harvest_then_finish_the_jobs() {
    let mut config = quiet(6);
    config.mode = RunMode::Harvest(Duration::ZERO);
    let summary = Driver::new(config).unwrap().run(&mut ()).unwrap();
    assert!(!summary.stopped);

    let mut best = summary.optimum;
    for job in summary.jobs {
        let floor = job.optimum();
        let report = Driver::from_job(job, quiet(6)).run(&mut ()).unwrap();
        assert!(report.optimum >= floor);
        assert!(report.completed());
        best = best.max(report.optimum);
    }
    assert_eq!(best, 18);
}

#[test]
fn harvest_after_builder_sets_the_mode() {
    let summary = Driver::new(quiet(8))
        .unwrap()
        .harvest_after(Duration::from_millis(20))
        .run(&mut ())
        .unwrap();
    assert!(!summary.jobs.is_empty());
    assert!(!summary.stopped);
    assert!(summary.jobs.iter().all(|job| job.grid().size() == 8));
}
