//! Diagnostic logging to stderr.
//!
//! The filter comes from `ROOKS_LOG`, then `RUST_LOG`, then [`DEFAULT_FILTER`].
//! Program output (grids, events, exported jobs) stays on stdout.

use std::fmt;

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Single-line records.
    #[default]
    Compact,
    /// Multi-line human-readable records.
    Pretty,
    /// One JSON object per record.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compact => f.write_str("compact"),
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

fn filter_directives() -> String {
    ["ROOKS_LOG", "RUST_LOG"]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn build_filter(directives: &str) -> EnvFilter {
    match EnvFilter::try_new(directives) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!(
                "warning: invalid log filter {directives:?} ({err}); using {DEFAULT_FILTER:?}"
            );
            EnvFilter::new(DEFAULT_FILTER)
        }
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(format: LogFormat) {
    let filter = build_filter(&filter_directives());
    let registry = tracing_subscriber::registry().with(filter);
    let res = match format {
        LogFormat::Compact => registry
            .with(tfmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tfmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(tfmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    // Already installed (tests, or a second init).
    let _ = res;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_falls_back() {
        let filter = build_filter("rooks=loud");
        assert!(filter.to_string().contains(DEFAULT_FILTER));
        assert!(
            build_filter("rooks_engine=debug")
                .to_string()
                .contains("rooks_engine=debug")
        );
    }

    #[test]
    fn log_format_names_round_trip() {
        for format in LogFormat::value_variants() {
            let parsed = LogFormat::from_str(&format.to_string(), false).unwrap();
            assert_eq!(parsed, *format);
        }
    }
}
