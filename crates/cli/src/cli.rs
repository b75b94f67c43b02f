use clap::Parser;

use crate::logging::LogFormat;

pub fn default_parallel() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(256)
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "rooks",
    version,
    about = "Exhaustive search for triangle-free rook placements in an N x N x N cube"
)]
pub struct Cli {
    /// Side of the cube.
    #[arg(
        short = 'n',
        long,
        env = "ROOKS_SIZE",
        default_value_t = 5,
        value_parser = clap::value_parser!(u8).range(1..=64)
    )]
    pub size: u8,

    /// Only report placements with more rooks than this.
    #[arg(short = 'g', long, env = "ROOKS_GUESS", default_value_t = 0)]
    pub guess: u32,

    /// Snapshot cadence in milliseconds.
    #[arg(
        long,
        env = "ROOKS_MONITOR_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub monitor_ms: u64,

    /// Print the best placement again every this many snapshots (0 disables).
    #[arg(long, env = "ROOKS_REMINDER", default_value_t = 0)]
    pub reminder: u32,

    /// Do not ask the worker for snapshots.
    #[arg(long, env = "ROOKS_NO_MONITOR", default_value_t = false)]
    pub no_monitor: bool,

    /// Emit one JSON event per line instead of text.
    #[arg(long, env = "ROOKS_JSON", default_value_t = false)]
    pub json: bool,

    /// Split the search into jobs after this many milliseconds and print them
    /// as base64, one per line. With `--bench`, the split delay.
    #[arg(long, env = "ROOKS_EXPORT_AFTER_MS")]
    pub export_after_ms: Option<u64>,

    /// Resume a job printed by `--export-after-ms` instead of starting a new
    /// search.
    #[arg(long, value_name = "B64", conflicts_with = "bench")]
    pub resume: Option<String>,

    /// Run the local benchmark with this many workers, then exit.
    #[arg(
        long,
        value_name = "PARALLEL",
        num_args = 0..=1,
        default_missing_value = "0",
        conflicts_with = "json"
    )]
    pub bench: Option<usize>,

    /// Log output format (logs go to stderr).
    #[arg(long, env = "ROOKS_LOG_FORMAT", value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn bench_parallel(&self) -> Option<usize> {
        self.bench.map(|n| if n == 0 { default_parallel() } else { n })
    }
}
