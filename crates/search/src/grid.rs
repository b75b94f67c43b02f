//! Search state: per-axis projections of the rooks placed so far.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::bitlane::{BitLane, LANE_WIDTH, bit, lowest, ones};

/// Errors returned when a grid cannot be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The cube does not fit in one occupancy lane.
    #[error("cube size {0} exceeds the {LANE_WIDTH}-bit lane width")]
    TooLarge(usize),

    /// A cube needs at least one cell.
    #[error("cube size must be at least 1")]
    Empty,
}

/// Reasons [`Grid::place`] refuses a rook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// A coordinate lies outside the cube.
    #[error("({x}, {y}, {z}) lies outside the cube")]
    OutOfRange {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
        /// Height.
        z: u8,
    },

    /// Another rook already shares two coordinates with the candidate.
    #[error("({x}, {y}, {z}) shares two coordinates with an existing rook")]
    Attacked {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
        /// Height.
        z: u8,
    },

    /// The candidate would close a triangle with two existing rooks.
    #[error("({x}, {y}, {z}) would create a double attack")]
    DoubleAttack {
        /// Column.
        x: u8,
        /// Row.
        y: u8,
        /// Height.
        z: u8,
    },
}

/// Bookkeeping that rides along with the projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Counters {
    pub(crate) rooks: u32,
    /// Heights `0..=max_rook_height` may be used.
    pub(crate) max_rook_height: u8,
    /// Cardinality of the row being filled.
    pub(crate) current_card: u8,
    /// Cardinality of the previous row (`size + 1` before the first row closes).
    pub(crate) last_card: u8,
}

/// One of the six ordered axis-pair projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Plane {
    Xy,
    Yx,
    Xz,
    Zx,
    Yz,
    Zy,
}

/// Rooks placed in an N×N×N cube, stored as six occupancy projections.
///
/// `xy[x]` has bit `y` set when a rook sits somewhere on pillar `(x, y)`, and
/// likewise for the other five ordered pairs. `xy` and `yx` carry one extra,
/// always-empty lane at index `size` so neighbour comparisons need no bounds
/// check.
///
/// The same type is handed out as a monitoring snapshot: clones are deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub(crate) size: u8,
    pub(crate) xy: Vec<BitLane>,
    pub(crate) yx: Vec<BitLane>,
    pub(crate) xz: Vec<BitLane>,
    pub(crate) zx: Vec<BitLane>,
    pub(crate) yz: Vec<BitLane>,
    pub(crate) zy: Vec<BitLane>,
    pub(crate) counters: Counters,
}

/// Serializable view of a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSummary {
    /// Cube size.
    pub size: u8,
    /// Number of rooks.
    pub rooks: u32,
    /// Occupied `(x, y, z)` cells.
    pub cells: Vec<[u8; 3]>,
}

impl Grid {
    /// Create an empty grid for a cube of side `size`.
    pub fn new(size: usize) -> Result<Self, ConfigurationError> {
        if size == 0 {
            return Err(ConfigurationError::Empty);
        }
        if size > LANE_WIDTH {
            return Err(ConfigurationError::TooLarge(size));
        }
        Ok(Self {
            size: size as u8,
            xy: vec![0; size + 1],
            yx: vec![0; size + 1],
            xz: vec![0; size],
            zx: vec![0; size],
            yz: vec![0; size],
            zy: vec![0; size],
            counters: Counters {
                rooks: 0,
                max_rook_height: 0,
                current_card: 0,
                last_card: size as u8 + 1,
            },
        })
    }

    /// Side of the cube.
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Number of rooks placed.
    pub fn rook_count(&self) -> u32 {
        self.counters.rooks
    }

    /// Whether a rook sits exactly at `(x, y, z)`.
    pub fn has_rook(&self, x: u8, y: u8, z: u8) -> bool {
        if x >= self.size || y >= self.size || z >= self.size {
            return false;
        }
        self.xy[x as usize] & bit(y) != 0
            && self.yz[y as usize] & bit(z) != 0
            && self.xz[x as usize] & bit(z) != 0
    }

    /// Height of the rook on pillar `(x, y)`.
    pub fn rook_z(&self, x: u8, y: u8) -> Option<u8> {
        if x >= self.size || y >= self.size || self.xy[x as usize] & bit(y) == 0 {
            return None;
        }
        lowest(self.yz[y as usize] & self.xz[x as usize])
    }

    /// Row of the rook on line `(x, ·, z)`.
    pub fn rook_y(&self, x: u8, z: u8) -> Option<u8> {
        if x >= self.size || z >= self.size || self.xz[x as usize] & bit(z) == 0 {
            return None;
        }
        lowest(self.xy[x as usize] & self.zy[z as usize])
    }

    /// Column of the rook on line `(·, y, z)`.
    pub fn rook_x(&self, y: u8, z: u8) -> Option<u8> {
        if y >= self.size || z >= self.size || self.yz[y as usize] & bit(z) == 0 {
            return None;
        }
        lowest(self.yx[y as usize] & self.zx[z as usize])
    }

    /// All occupied cells, ordered by `x` then `y`.
    pub fn rooks(&self) -> Vec<(u8, u8, u8)> {
        let mut out = Vec::with_capacity(self.counters.rooks as usize);
        for x in 0..self.size {
            for y in ones(self.xy[x as usize]) {
                if let Some(z) = self.rook_z(x, y) {
                    out.push((x, y, z));
                }
            }
        }
        out
    }

    /// Serializable summary of the occupied cells.
    pub fn summary(&self) -> GridSummary {
        GridSummary {
            size: self.size,
            rooks: self.counters.rooks,
            cells: self.rooks().into_iter().map(|(x, y, z)| [x, y, z]).collect(),
        }
    }

    /// Check whether a rook could legally be added at `(x, y, z)`.
    pub fn check(&self, x: u8, y: u8, z: u8) -> Result<(), PlacementError> {
        if x >= self.size || y >= self.size || z >= self.size {
            return Err(PlacementError::OutOfRange { x, y, z });
        }
        let (xi, yi, zi) = (x as usize, y as usize, z as usize);
        if self.xy[xi] & bit(y) != 0 || self.xz[xi] & bit(z) != 0 || self.yz[yi] & bit(z) != 0 {
            return Err(PlacementError::Attacked { x, y, z });
        }
        if self.xz[xi] & self.yz[yi] != 0
            || self.zx[zi] & self.yx[yi] != 0
            || self.zy[zi] & self.xy[xi] != 0
        {
            return Err(PlacementError::DoubleAttack { x, y, z });
        }
        Ok(())
    }

    /// Add a rook at `(x, y, z)` after checking it against every placed rook.
    ///
    /// Only the projections and the rook count change; the traversal
    /// bookkeeping the search keeps is left alone.
    pub fn place(&mut self, x: u8, y: u8, z: u8) -> Result<(), PlacementError> {
        self.check(x, y, z)?;
        let (xi, yi, zi) = (x as usize, y as usize, z as usize);
        self.xy[xi] |= bit(y);
        self.yx[yi] |= bit(x);
        self.xz[xi] |= bit(z);
        self.zx[zi] |= bit(x);
        self.yz[yi] |= bit(z);
        self.zy[zi] |= bit(y);
        self.counters.rooks += 1;
        Ok(())
    }

    pub(crate) fn lane_mut(&mut self, plane: Plane, index: u8) -> &mut BitLane {
        let lanes = match plane {
            Plane::Xy => &mut self.xy,
            Plane::Yx => &mut self.yx,
            Plane::Xz => &mut self.xz,
            Plane::Zx => &mut self.zx,
            Plane::Yz => &mut self.yz,
            Plane::Zy => &mut self.zy,
        };
        &mut lanes[index as usize]
    }
}

fn digits(mut n: u8) -> usize {
    let mut d = 1;
    while n >= 10 {
        d += 1;
        n /= 10;
    }
    d
}

/// Heights are printed 1-based, `*` marks an empty pillar, rows top to bottom
/// by increasing `y`.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = digits(self.size);
        let rule = "-".repeat(2 + self.size as usize * (width + 1));
        writeln!(f, "size : {}", self.counters.rooks)?;
        writeln!(f, "{rule}")?;
        for y in 0..self.size {
            f.write_str("|")?;
            for x in 0..self.size {
                match self.rook_z(x, y) {
                    Some(z) => write!(f, "{:>width$} ", z + 1)?,
                    None => write!(f, "{:>width$} ", '*')?,
                }
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_sizes_outside_lane() {
        assert_eq!(Grid::new(0), Err(ConfigurationError::Empty));
        assert_eq!(Grid::new(65), Err(ConfigurationError::TooLarge(65)));
        let g = Grid::new(64).unwrap();
        assert_eq!(g.size(), 64);
        assert_eq!(g.xy.len(), 65);
        assert_eq!(g.counters.last_card, 65);
    }

    #[test]
    fn place_rejects_shared_pairs() {
        let mut g = Grid::new(4).unwrap();
        g.place(1, 2, 3).unwrap();
        assert!(matches!(g.place(1, 2, 0), Err(PlacementError::Attacked { .. })));
        assert!(matches!(g.place(1, 0, 3), Err(PlacementError::Attacked { .. })));
        assert!(matches!(g.place(0, 2, 3), Err(PlacementError::Attacked { .. })));
        assert!(matches!(g.place(4, 0, 0), Err(PlacementError::OutOfRange { .. })));
        g.place(0, 2, 0).unwrap();
        assert_eq!(g.rook_count(), 2);
    }

    #[test]
    fn place_rejects_double_attack() {
        let mut g = Grid::new(3).unwrap();
        // Shares x with the first, y with the second, which share z.
        g.place(0, 1, 2).unwrap();
        g.place(1, 0, 2).unwrap();
        assert_eq!(
            g.check(0, 0, 0),
            Err(PlacementError::DoubleAttack { x: 0, y: 0, z: 0 })
        );
        // Shares y and z through a common x.
        let mut g = Grid::new(3).unwrap();
        g.place(2, 0, 1).unwrap();
        g.place(2, 1, 0).unwrap();
        assert!(matches!(g.check(0, 0, 0), Err(PlacementError::DoubleAttack { .. })));
    }

    #[test]
    fn inspection_agrees_across_axes() {
        let mut g = Grid::new(5).unwrap();
        g.place(3, 1, 4).unwrap();
        g.place(0, 4, 2).unwrap();
        assert!(g.has_rook(3, 1, 4));
        assert!(!g.has_rook(3, 1, 3));
        assert_eq!(g.rook_z(3, 1), Some(4));
        assert_eq!(g.rook_y(3, 4), Some(1));
        assert_eq!(g.rook_x(1, 4), Some(3));
        assert_eq!(g.rook_z(2, 2), None);
        assert_eq!(g.rook_z(9, 0), None);
        assert_eq!(g.rooks(), vec![(0, 4, 2), (3, 1, 4)]);
        assert_eq!(g.summary().cells, vec![[0, 4, 2], [3, 1, 4]]);
    }

    #[test]
    fn display_renders_heights_one_based() {
        let mut g = Grid::new(2).unwrap();
        g.place(1, 0, 0).unwrap();
        g.place(0, 1, 1).unwrap();
        let text = g.to_string();
        assert_eq!(text, "size : 2\n------\n|* 1 |\n|2 * |\n------\n");
    }

    #[test]
    fn display_pads_wide_heights() {
        let mut g = Grid::new(10).unwrap();
        g.place(0, 0, 9).unwrap();
        let text = g.to_string();
        let first_row = text.lines().nth(2).unwrap();
        assert!(first_row.starts_with("|10  *"));
        assert_eq!(first_row.len(), 2 + 10 * 3);
    }
}
