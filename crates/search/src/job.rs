//! Resumable units of search work.

use std::fmt;

use crate::grid::{ConfigurationError, Grid};
use crate::search::{Checkpoint, Outcome, Search, SearchStats};

/// Where a job picks the search back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Try pillar `(x, y)` from height `z` upwards.
    Pillar {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
        /// First height to try.
        z: u8,
    },
    /// Pillar `(x, y)` is settled; continue with the pillar after it.
    Row {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
    },
}

/// Stable identifier of a job variant on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobTag {
    /// [`Resume::Pillar`].
    Pillar,
    /// [`Resume::Row`].
    Row,
}

impl JobTag {
    /// Every built-in tag.
    pub const ALL: [JobTag; 2] = [JobTag::Pillar, JobTag::Row];

    /// Wire name of the tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            JobTag::Pillar => "rooks.pillar",
            JobTag::Row => "rooks.row",
        }
    }
}

impl fmt::Display for JobTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grid, a point to resume from, and the optimum known when it was cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub(crate) grid: Grid,
    pub(crate) resume: Resume,
    pub(crate) optimum: u32,
}

/// Result of running a job to the end or to an interruption.
#[derive(Debug)]
pub struct JobReport {
    /// Best rook count known when the run stopped.
    pub optimum: u32,
    /// How the run ended.
    pub outcome: Outcome,
    /// Engine counters for the run.
    pub stats: SearchStats,
}

impl Job {
    pub(crate) fn new(grid: Grid, resume: Resume, optimum: u32) -> Self {
        Self {
            grid,
            resume,
            optimum,
        }
    }

    /// The whole search for a cube of side `size`, reporting only placements
    /// with more than `guess` rooks.
    pub fn initial(size: usize, guess: u32) -> Result<Job, ConfigurationError> {
        let grid = Grid::new(size)?;
        let last = grid.size() - 1;
        Ok(Job::new(
            grid,
            Resume::Pillar {
                x: last,
                y: last,
                z: 0,
            },
            guess,
        ))
    }

    /// Wire tag of this job's variant.
    pub fn tag(&self) -> JobTag {
        match self.resume {
            Resume::Pillar { .. } => JobTag::Pillar,
            Resume::Row { .. } => JobTag::Row,
        }
    }

    /// Append the untagged payload to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        crate::wire::encode_payload(self, out);
    }

    /// Merge a lower bound on the optimum. Never lowers it.
    pub fn raise_floor(&mut self, candidate: u32) {
        self.optimum = self.optimum.max(candidate);
    }

    /// Optimum floor carried by the job.
    pub fn optimum(&self) -> u32 {
        self.optimum
    }

    /// Grid the job resumes from.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Resumption point.
    pub fn resume(&self) -> Resume {
        self.resume
    }

    /// Consume the job by running it.
    pub fn run<C: Checkpoint>(self, checkpoint: &mut C) -> JobReport {
        let mut search = Search::new(self.grid, self.optimum);
        let outcome = search.run(self.resume, checkpoint);
        JobReport {
            optimum: search.optimum(),
            outcome,
            stats: *search.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Unattended;

    #[test]
    fn initial_job_starts_at_far_corner() {
        let job = Job::initial(5, 3).unwrap();
        assert_eq!(job.resume(), Resume::Pillar { x: 4, y: 4, z: 0 });
        assert_eq!(job.optimum(), 3);
        assert_eq!(job.tag(), JobTag::Pillar);
        assert_eq!(job.grid().rook_count(), 0);
        assert_eq!(Job::initial(0, 0), Err(ConfigurationError::Empty));
    }

    #[test]
    fn raise_floor_only_raises() {
        let mut job = Job::initial(3, 4).unwrap();
        job.raise_floor(2);
        assert_eq!(job.optimum(), 4);
        job.raise_floor(7);
        assert_eq!(job.optimum(), 7);
    }

    #[test]
    fn run_reports_optimum_and_stats() {
        let report = Job::initial(3, 0).unwrap().run(&mut Unattended);
        assert!(matches!(report.outcome, Outcome::Completed));
        assert_eq!(report.optimum, 6);
        assert!(report.stats.leaves > 0);
        assert!(report.stats.placements >= 6);
    }

    #[test]
    fn tags_have_stable_names() {
        assert_eq!(JobTag::Pillar.to_string(), "rooks.pillar");
        assert_eq!(JobTag::Row.as_str(), "rooks.row");
    }
}
