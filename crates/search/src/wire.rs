//! Byte layout of a job.
//!
//! All integers are little-endian. The payload is
//!
//! ```text
//! version u8 | size u8 | optimum u32 | rooks u32
//! max_rook_height u8 | current_card u8 | last_card u8
//! xy[size+1] yx[size+1] xz[size] zx[size] yz[size] zy[size]   (u64 each)
//! pillar: x u8 y u8 z u8  |  row: x u8 y u8
//! ```
//!
//! The registry frames a payload as `tag_len u8 | tag | payload`.

use thiserror::Error;

use crate::bitlane::{BitLane, LANE_WIDTH, low_mask};
use crate::grid::{Counters, Grid, PlacementError};
use crate::job::{Job, JobTag, Resume};

/// Current payload version.
pub const WIRE_VERSION: u8 = 1;

const HEADER_LEN: usize = 1 + 1 + 4 + 4 + 3;

/// Reasons a byte buffer is not a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptPayload {
    /// The buffer ended before a complete field.
    #[error("payload truncated")]
    Truncated,

    /// The frame names a tag nobody registered.
    #[error("unknown job tag {0:?}")]
    UnknownTag(String),

    /// The frame's tag is not UTF-8.
    #[error("job tag is not valid UTF-8")]
    BadTag,

    /// The payload was written by another version.
    #[error("unsupported payload version {0}")]
    Version(u8),

    /// The cube size is zero or wider than a lane.
    #[error("invalid cube size {0}")]
    Size(u8),

    /// The buffer is longer or shorter than the size implies.
    #[error("expected {expected} bytes, found {actual}")]
    Length {
        /// Bytes the header implies.
        expected: usize,
        /// Bytes present.
        actual: usize,
    },

    /// A resumption coordinate lies outside the cube.
    #[error("resume point outside the cube")]
    Coordinate,

    /// A lane has bits at or above the cube size, or a sentinel is set.
    #[error("lane {0} has bits outside the cube")]
    StrayBits(&'static str),

    /// The projections do not describe a legal placement.
    #[error("projections are inconsistent: {0}")]
    Inconsistent(&'static str),

    /// A bookkeeping counter is out of range.
    #[error("counter {0} out of range")]
    Counter(&'static str),
}

fn payload_len(size: usize, tag: JobTag) -> usize {
    let lanes = 2 * (size + 1) + 4 * size;
    let coords = match tag {
        JobTag::Pillar => 3,
        JobTag::Row => 2,
    };
    HEADER_LEN + lanes * 8 + coords
}

pub(crate) fn encode_payload(job: &Job, out: &mut Vec<u8>) {
    let grid = job.grid();
    let c = &grid.counters;
    out.reserve(payload_len(grid.size as usize, job.tag()));
    out.push(WIRE_VERSION);
    out.push(grid.size);
    out.extend_from_slice(&job.optimum().to_le_bytes());
    out.extend_from_slice(&c.rooks.to_le_bytes());
    out.extend_from_slice(&[c.max_rook_height, c.current_card, c.last_card]);
    for lanes in [&grid.xy, &grid.yx, &grid.xz, &grid.zx, &grid.yz, &grid.zy] {
        for lane in lanes {
            out.extend_from_slice(&lane.to_le_bytes());
        }
    }
    match job.resume() {
        Resume::Pillar { x, y, z } => out.extend_from_slice(&[x, y, z]),
        Resume::Row { x, y } => out.extend_from_slice(&[x, y]),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CorruptPayload> {
        if self.bytes.len() < n {
            return Err(CorruptPayload::Truncated);
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, CorruptPayload> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CorruptPayload> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn lanes(&mut self, n: usize) -> Result<Vec<BitLane>, CorruptPayload> {
        let raw = self.take(n * 8)?;
        Ok(raw
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                BitLane::from_le_bytes(buf)
            })
            .collect())
    }
}

/// Decode an untagged payload of the given variant.
pub(crate) fn decode_payload(tag: JobTag, bytes: &[u8]) -> Result<Job, CorruptPayload> {
    let mut r = Reader { bytes };
    let version = r.u8()?;
    if version != WIRE_VERSION {
        return Err(CorruptPayload::Version(version));
    }
    let size = r.u8()?;
    if size == 0 || size as usize > LANE_WIDTH {
        return Err(CorruptPayload::Size(size));
    }
    let n = size as usize;
    let expected = payload_len(n, tag);
    if bytes.len() != expected {
        return Err(CorruptPayload::Length {
            expected,
            actual: bytes.len(),
        });
    }

    let optimum = r.u32()?;
    let rooks = r.u32()?;
    let counters = Counters {
        rooks,
        max_rook_height: r.u8()?,
        current_card: r.u8()?,
        last_card: r.u8()?,
    };
    let decoded = Grid {
        size,
        xy: r.lanes(n + 1)?,
        yx: r.lanes(n + 1)?,
        xz: r.lanes(n)?,
        zx: r.lanes(n)?,
        yz: r.lanes(n)?,
        zy: r.lanes(n)?,
        counters,
    };
    let resume = match tag {
        JobTag::Pillar => Resume::Pillar {
            x: r.u8()?,
            y: r.u8()?,
            z: r.u8()?,
        },
        JobTag::Row => Resume::Row {
            x: r.u8()?,
            y: r.u8()?,
        },
    };

    let in_cube = match resume {
        Resume::Pillar { x, y, z } => x < size && y < size && z < size,
        Resume::Row { x, y } => x < size && y < size,
    };
    if !in_cube {
        return Err(CorruptPayload::Coordinate);
    }
    if counters.max_rook_height >= size {
        return Err(CorruptPayload::Counter("max_rook_height"));
    }
    if counters.last_card > size + 1 {
        return Err(CorruptPayload::Counter("last_card"));
    }
    if counters.current_card > size {
        return Err(CorruptPayload::Counter("current_card"));
    }

    check_lanes(&decoded)?;
    let rebuilt = rebuild(&decoded)?;
    if rebuilt.counters.rooks != rooks {
        return Err(CorruptPayload::Counter("rooks"));
    }
    Ok(Job::new(decoded, resume, optimum))
}

fn check_lanes(grid: &Grid) -> Result<(), CorruptPayload> {
    let n = grid.size as usize;
    let outside = !low_mask(u32::from(grid.size));
    let planes: [(&'static str, &Vec<BitLane>); 6] = [
        ("xy", &grid.xy),
        ("yx", &grid.yx),
        ("xz", &grid.xz),
        ("zx", &grid.zx),
        ("yz", &grid.yz),
        ("zy", &grid.zy),
    ];
    for (name, lanes) in planes {
        if lanes[..n].iter().any(|lane| lane & outside != 0) {
            return Err(CorruptPayload::StrayBits(name));
        }
        if lanes.len() > n && lanes[n] != 0 {
            return Err(CorruptPayload::StrayBits(name));
        }
    }
    Ok(())
}

/// Replay the rooks the `xy`/`xz`/`yz` projections imply and require the
/// result to match all six projections.
fn rebuild(decoded: &Grid) -> Result<Grid, CorruptPayload> {
    let size = decoded.size;
    let mut grid = Grid::new(size as usize).map_err(|_| CorruptPayload::Size(size))?;
    for x in 0..size {
        for y in crate::bitlane::ones(decoded.xy[x as usize]) {
            let heights = decoded.xz[x as usize] & decoded.yz[y as usize];
            if heights.count_ones() != 1 {
                return Err(CorruptPayload::Inconsistent("pillar height is ambiguous"));
            }
            let z = heights.trailing_zeros() as u8;
            grid.place(x, y, z).map_err(|e| match e {
                PlacementError::OutOfRange { .. } => CorruptPayload::Coordinate,
                PlacementError::Attacked { .. } => {
                    CorruptPayload::Inconsistent("rooks share two coordinates")
                }
                PlacementError::DoubleAttack { .. } => {
                    CorruptPayload::Inconsistent("rooks form a double attack")
                }
            })?;
        }
    }
    let same = grid.xy == decoded.xy
        && grid.yx == decoded.yx
        && grid.xz == decoded.xz
        && grid.zx == decoded.zx
        && grid.yz == decoded.yz
        && grid.zy == decoded.zy;
    if !same {
        return Err(CorruptPayload::Inconsistent("projections disagree"));
    }
    Ok(grid)
}
