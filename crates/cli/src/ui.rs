use std::io::Write;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::format::{format_duration, format_number};

/// Live status for an interactive terminal: one status line and one line for
/// stop messages, with grids printed above them.
pub struct Ui {
    mp: MultiProgress,
    status_pb: ProgressBar,
    stop_pb: ProgressBar,
    size: u8,
}

impl Ui {
    pub fn new(size: u8) -> Self {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stdout());
        mp.set_move_cursor(true);

        let status_pb = mp.add(ProgressBar::new_spinner());
        status_pb.set_style(line_style());
        status_pb.set_message(status_line(size, 0, None, Duration::ZERO));

        let stop_pb = mp.add(ProgressBar::new(0));
        stop_pb.set_style(line_style());
        stop_pb.set_message(" ");

        Self {
            mp,
            status_pb,
            stop_pb,
            size,
        }
    }

    pub fn println(&self, msg: &str) {
        for line in msg.lines() {
            let _ = self.mp.println(line);
        }
    }

    pub fn set_status(&self, best: u32, current: Option<u32>, elapsed: Duration) {
        self.status_pb
            .set_message(status_line(self.size, best, current, elapsed));
    }

    pub fn set_stop_message(&self, msg: &str) {
        self.stop_pb.set_message(msg.to_string());
    }

    pub fn freeze(&self) {
        self.mp.set_move_cursor(false);
        self.status_pb.abandon();
        self.stop_pb.abandon();
        let _ = std::io::stdout().write_all(b"\n");
    }
}

fn line_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}\u{1b}[0K")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn status_line(size: u8, best: u32, current: Option<u32>, elapsed: Duration) -> String {
    let current = current.map_or_else(|| "-".to_string(), |n| format_number(u64::from(n)));
    format!(
        "N={size} | best {} | current {current} | {}",
        format_number(u64::from(best)),
        format_duration(elapsed)
    )
}
