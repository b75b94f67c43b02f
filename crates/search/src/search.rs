//! Backtracking engine.
//!
//! Pillars `(x, y)` are decided one at a time, rows `y = N-1 ..= 0` and inside
//! a row columns `x = N-1 ..= 0`. For each pillar the engine tries every
//! admissible height, then the empty pillar. Three symmetry cuts keep the tree
//! small:
//!
//! * heights are introduced in traversal order (`max_rook_height`);
//! * an empty column's `xy` lane is never below the column right of it;
//! * a row reaching the previous row's cardinality must not have a smaller
//!   `yx` lane than that row.
//!
//! The engine polls a [`Checkpoint`] at every pillar. A harvest request makes
//! every frame on the way out restore its mutation and package what it has
//! left to explore as a [`Job`]; the resulting list covers the unexplored part
//! of the tree exactly once.

use std::mem;
use std::ops::{Deref, DerefMut};

use serde::Serialize;

use crate::bitlane::{BitLane, bit, low_mask, ones};
use crate::grid::{Counters, Grid, Plane};
use crate::job::{Job, Resume};

/// What the caller wants the engine to do after a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep searching.
    Continue,
    /// Unwind and hand back the unexplored remainder as jobs.
    Harvest,
    /// Unwind without producing jobs.
    Halt,
}

/// Caller hooks invoked from inside the search.
pub trait Checkpoint {
    /// Called on entry to every pillar with the live grid.
    ///
    /// The checkpoint may raise `optimum` to tighten pruning; lowering it is
    /// ignored.
    fn poll(&mut self, grid: &Grid, optimum: &mut u32) -> Directive;

    /// Called when a complete placement beats the incumbent.
    fn improved(&mut self, grid: &Grid, optimum: u32) -> Directive {
        let _ = (grid, optimum);
        Directive::Continue
    }
}

/// Checkpoint that never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

impl Checkpoint for Unattended {
    fn poll(&mut self, _grid: &Grid, _optimum: &mut u32) -> Directive {
        Directive::Continue
    }
}

/// Counters for one run of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Checkpoint polls (one per pillar visited).
    pub polls: u64,
    /// Rooks placed.
    pub placements: u64,
    /// Complete assignments reached.
    pub leaves: u64,
    /// Subtrees cut by the bound or the column ordering.
    pub prunes: u64,
    /// Jobs packaged by a harvest.
    pub jobs: u64,
}

impl SearchStats {
    /// Add another run's counters to these.
    pub fn absorb(&mut self, other: &SearchStats) {
        self.polls += other.polls;
        self.placements += other.placements;
        self.leaves += other.leaves;
        self.prunes += other.prunes;
        self.jobs += other.jobs;
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    /// The subtree was fully explored.
    Completed,
    /// A harvest interrupted the run; the jobs cover what was left.
    Harvested(Vec<Job>),
    /// A halt interrupted the run.
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Harvest,
    Halt,
}

impl From<Directive> for Flow {
    fn from(d: Directive) -> Self {
        match d {
            Directive::Continue => Flow::Continue,
            Directive::Harvest => Flow::Harvest,
            Directive::Halt => Flow::Halt,
        }
    }
}

/// Branch-and-bound search over one grid.
#[derive(Debug)]
pub struct Search {
    grid: Grid,
    optimum: u32,
    stats: SearchStats,
    harvest: Vec<Job>,
}

impl Search {
    /// Search starting from `grid`, only reporting placements larger than
    /// `optimum`.
    pub fn new(grid: Grid, optimum: u32) -> Self {
        Self {
            grid,
            optimum,
            stats: SearchStats::default(),
            harvest: Vec::new(),
        }
    }

    /// Explore the subtree designated by `resume`.
    ///
    /// The grid is back in its starting state when this returns, whatever the
    /// outcome.
    pub fn run<C: Checkpoint>(&mut self, resume: Resume, checkpoint: &mut C) -> Outcome {
        let flow = match resume {
            Resume::Pillar { x, y, z } => self.pillar(checkpoint, x, y, z),
            Resume::Row { x, y } => self.next_pillar(checkpoint, x, y),
        };
        match flow {
            Flow::Continue => Outcome::Completed,
            Flow::Harvest => {
                let jobs = mem::take(&mut self.harvest);
                self.stats.jobs += jobs.len() as u64;
                Outcome::Harvested(jobs)
            }
            Flow::Halt => {
                self.harvest.clear();
                Outcome::Halted
            }
        }
    }

    /// Best rook count known to this search.
    pub fn optimum(&self) -> u32 {
        self.optimum
    }

    /// Counters accumulated over every run.
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// The live grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Give back the grid.
    pub fn into_grid(self) -> Grid {
        self.grid
    }

    fn package(&mut self, resume: Resume) {
        self.harvest.push(Job::new(self.grid.clone(), resume, self.optimum));
    }

    /// Bound and column-ordering test for leaving pillar `(x, y)` empty.
    fn worth_continuing(&self, x: u8, y: u8) -> bool {
        let c = &self.grid.counters;
        let current = i64::from(c.current_card);
        // After an empty row `last_card` is 0 and `allowed` goes negative.
        let reach = (current + i64::from(x)).min(i64::from(c.last_card));
        let allowed = reach - current;
        if reach * i64::from(y) + allowed + i64::from(c.rooks) <= i64::from(self.optimum) {
            return false;
        }
        self.grid.xy[x as usize] >= self.grid.xy[x as usize + 1]
    }

    fn pillar<C: Checkpoint>(&mut self, cp: &mut C, x: u8, y: u8, z0: u8) -> Flow {
        self.stats.polls += 1;
        let before = self.optimum;
        let directive = cp.poll(&self.grid, &mut self.optimum);
        self.optimum = self.optimum.max(before);
        match directive {
            Directive::Continue => {}
            Directive::Harvest => {
                self.package(Resume::Pillar { x, y, z: z0 });
                return Flow::Harvest;
            }
            Directive::Halt => return Flow::Halt,
        }

        let (xi, yi) = (x as usize, y as usize);
        let gxz = self.grid.xz[xi];
        let gyz = self.grid.yz[yi];
        if gxz & gyz == 0 {
            let Counters {
                current_card: cc,
                last_card,
                max_rook_height: max_z,
                ..
            } = self.grid.counters;
            let gxy = self.grid.xy[xi];
            let gyx = self.grid.yx[yi];
            let closing = cc + 1 == last_card;

            if closing && (gyx | bit(x)) < self.grid.yx[yi + 1] {
                // Any filling of the rest of this row is smaller still: close it.
                let mut closed = Scope::enter(self);
                closed.grid.counters.last_card = cc;
                closed.grid.counters.current_card = 0;
                return closed.next_row(cp, y);
            }

            let size = self.grid.size;
            let free: BitLane =
                !(gxz | gyz) & low_mask(u32::from(max_z) + 1) & !low_mask(u32::from(z0));
            for z in ones(free) {
                let zi = z as usize;
                if self.grid.zx[zi] & gyx != 0 || self.grid.zy[zi] & gxy != 0 {
                    continue;
                }
                let fresh = z == max_z && max_z + 1 < size;
                self.stats.placements += 1;

                let flow = {
                    let mut placed = Scope::enter(self);
                    placed.toggle(Plane::Xy, x, bit(y));
                    placed.toggle(Plane::Yx, y, bit(x));
                    placed.toggle(Plane::Xz, x, bit(z));
                    placed.toggle(Plane::Yz, y, bit(z));
                    placed.toggle(Plane::Zx, z, bit(x));
                    placed.toggle(Plane::Zy, z, bit(y));
                    let counters = &mut placed.grid.counters;
                    counters.rooks += 1;
                    counters.current_card = if closing { 0 } else { cc + 1 };
                    if fresh {
                        counters.max_rook_height = max_z + 1;
                    }
                    if closing {
                        placed.next_row(cp, y)
                    } else {
                        placed.next_pillar(cp, x, y)
                    }
                };

                match flow {
                    Flow::Continue => {}
                    Flow::Harvest => {
                        let rest = free & !low_mask(u32::from(z) + 1);
                        if fresh || rest == 0 {
                            if self.worth_continuing(x, y) {
                                self.package(Resume::Row { x, y });
                            }
                        } else {
                            self.package(Resume::Pillar { x, y, z: z + 1 });
                        }
                        return Flow::Harvest;
                    }
                    Flow::Halt => return Flow::Halt,
                }
                if fresh {
                    break;
                }
            }
        }

        if self.worth_continuing(x, y) {
            self.next_pillar(cp, x, y)
        } else {
            self.stats.prunes += 1;
            Flow::Continue
        }
    }

    fn next_pillar<C: Checkpoint>(&mut self, cp: &mut C, x: u8, y: u8) -> Flow {
        if x > 0 {
            return self.pillar(cp, x - 1, y, 0);
        }
        let mut closed = Scope::enter(self);
        let counters = &mut closed.grid.counters;
        counters.last_card = counters.current_card;
        counters.current_card = 0;
        closed.next_row(cp, y)
    }

    fn next_row<C: Checkpoint>(&mut self, cp: &mut C, y: u8) -> Flow {
        if y > 0 {
            let last = self.grid.size - 1;
            return self.pillar(cp, last, y - 1, 0);
        }
        self.stats.leaves += 1;
        let rooks = self.grid.counters.rooks;
        if rooks <= self.optimum {
            return Flow::Continue;
        }
        self.optimum = rooks;
        cp.improved(&self.grid, rooks).into()
    }
}

const MAX_TOGGLES: usize = 6;

/// Speculative update of a [`Search`], reverted on drop.
///
/// Counters are snapshotted on entry and every lane toggle is recorded, so
/// the grid is restored on every exit path.
struct Scope<'a> {
    search: &'a mut Search,
    saved: Counters,
    toggles: [(Plane, u8, BitLane); MAX_TOGGLES],
    len: usize,
}

impl<'a> Scope<'a> {
    fn enter(search: &'a mut Search) -> Self {
        let saved = search.grid.counters;
        Self {
            search,
            saved,
            toggles: [(Plane::Xy, 0, 0); MAX_TOGGLES],
            len: 0,
        }
    }

    fn toggle(&mut self, plane: Plane, index: u8, mask: BitLane) {
        *self.search.grid.lane_mut(plane, index) ^= mask;
        self.toggles[self.len] = (plane, index, mask);
        self.len += 1;
    }
}

impl Deref for Scope<'_> {
    type Target = Search;

    fn deref(&self) -> &Search {
        self.search
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Search {
        self.search
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        for &(plane, index, mask) in &self.toggles[..self.len] {
            *self.search.grid.lane_mut(plane, index) ^= mask;
        }
        self.search.grid.counters = self.saved;
    }
}
