//! Fixed-width occupancy lanes.
//!
//! A lane records which coordinates along one axis are used, bit `i` standing
//! for coordinate `i`. Every projection of the search grid is a vector of lanes.

/// One occupancy lane.
pub type BitLane = u64;

/// Number of coordinates a single lane can hold, and so the largest cube size.
pub const LANE_WIDTH: usize = BitLane::BITS as usize;

/// Lane with only coordinate `i` set.
#[inline]
pub fn bit(i: u8) -> BitLane {
    1 << i
}

/// Lowest coordinate set in `lane`, or `None` for an empty lane.
#[inline]
pub fn lowest(lane: BitLane) -> Option<u8> {
    if lane == 0 {
        None
    } else {
        Some(lane.trailing_zeros() as u8)
    }
}

/// Lane with coordinates `0..n` set.
#[inline]
pub fn low_mask(n: u32) -> BitLane {
    if n as usize >= LANE_WIDTH {
        BitLane::MAX
    } else {
        (1 << n) - 1
    }
}

/// Iterate the coordinates set in `lane`, lowest first.
pub fn ones(lane: BitLane) -> Ones {
    Ones(lane)
}

/// Iterator returned by [`ones`].
#[derive(Debug, Clone)]
pub struct Ones(BitLane);

impl Iterator for Ones {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let i = lowest(self.0)?;
        self.0 &= self.0 - 1;
        Some(i)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Ones {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_finds_first_set_bit() {
        assert_eq!(lowest(0), None);
        assert_eq!(lowest(0b1), Some(0));
        assert_eq!(lowest(0b1011_0000), Some(4));
        assert_eq!(lowest(bit(63)), Some(63));
    }

    #[test]
    fn low_mask_saturates_at_lane_width() {
        assert_eq!(low_mask(0), 0);
        assert_eq!(low_mask(3), 0b111);
        assert_eq!(low_mask(63), BitLane::MAX >> 1);
        assert_eq!(low_mask(64), BitLane::MAX);
        assert_eq!(low_mask(200), BitLane::MAX);
    }

    #[test]
    fn ones_walks_ascending() {
        let got: Vec<u8> = ones(0b1010_0110).collect();
        assert_eq!(got, vec![1, 2, 5, 7]);
        assert_eq!(ones(BitLane::MAX).len(), 64);
        assert_eq!(ones(0).next(), None);
    }
}
