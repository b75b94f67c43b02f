use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use rooks_search::{Grid, GridSummary};

/// One line of `--json` output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Started {
        at: String,
        size: u8,
        guess: u32,
        tag: String,
    },
    Monitor {
        at: String,
        grid: GridSummary,
    },
    Optimum {
        at: String,
        value: u32,
        grid: GridSummary,
    },
    Reminder {
        at: String,
        grid: GridSummary,
    },
    StopRequested {
        at: String,
    },
    Finished {
        at: String,
        optimum: u32,
        completed: bool,
        stopped: bool,
        elapsed_ms: u64,
        best: Option<GridSummary>,
        jobs: Vec<String>,
    },
}

pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Event {
    pub fn to_line(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|err| format!("{{\"type\":\"error\",\"message\":\"{err}\"}}"))
    }
}

pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    if total == 0 {
        return format!("{}ms", d.as_millis());
    }
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    if h > 0 {
        format!("{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

pub fn format_optimum_line(value: u32, elapsed: Duration) -> String {
    format!(
        "New optimum: {} rooks after {}",
        format_number(u64::from(value)),
        format_duration(elapsed)
    )
}

/// Heading plus the rendered grid, for text mode.
pub fn format_grid_block(heading: &str, grid: &Grid) -> String {
    format!("{heading}\n{grid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(30_771), "30,771");
        assert_eq!(format_number(4_200_000), "4,200,000");
    }

    #[test]
    fn format_duration_picks_a_unit() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
        assert_eq!(format_duration(Duration::from_secs(3_661)), "1h01m01s");
    }

    #[test]
    fn events_are_tagged() {
        let grid = Grid::new(2).unwrap();
        let line = Event::Optimum {
            at: now(),
            value: 0,
            grid: grid.summary(),
        }
        .to_line();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "optimum");
        assert_eq!(value["grid"]["size"], 2);
        assert_eq!(value["grid"]["cells"].as_array().map(Vec::len), Some(0));

        let line = Event::StopRequested { at: now() }.to_line();
        assert!(line.starts_with("{\"type\":\"stop_requested\""));
    }

    #[test]
    fn grid_block_puts_heading_first() {
        let grid = Grid::new(1).unwrap();
        let block = format_grid_block("Best grid found:", &grid);
        assert!(block.starts_with("Best grid found:\nsize : 0\n"));
    }
}
