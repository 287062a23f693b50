//! Per-run context and progress reporting.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::info;

/// State owned by one import run and handed to the importer explicitly.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub started_at: DateTime<Utc>,
    pub log_file: Option<PathBuf>,
    /// Report progress every N rows; 0 reports only on completion.
    pub progress_interval: usize,
    clock: Instant,
}

impl RunContext {
    pub fn new(log_file: Option<PathBuf>, progress_interval: usize) -> Self {
        Self {
            started_at: Utc::now(),
            log_file,
            progress_interval,
            clock: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.clock.elapsed()
    }

    pub fn progress(&self, desc: impl Into<String>, unit: &'static str, total: usize) -> Progress {
        Progress {
            desc: desc.into(),
            unit,
            total,
            done: 0,
            interval: self.progress_interval,
            last_reported: 0,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(None, 0)
    }
}

/// Monotonic counter of attempted rows for one file.
#[derive(Debug)]
pub struct Progress {
    desc: String,
    unit: &'static str,
    total: usize,
    done: usize,
    interval: usize,
    last_reported: usize,
}

impl Progress {
    pub fn advance(&mut self, n: usize) {
        self.done = (self.done + n).min(self.total);
        let due = self.interval > 0 && self.done - self.last_reported >= self.interval;
        if due || self.done == self.total {
            let pct = if self.total == 0 {
                100.0
            } else {
                self.done as f64 / self.total as f64 * 100.0
            };
            info!(
                "📊 {}: {:.1}% ({}/{}) {}",
                self.desc, pct, self.done, self.total, self.unit
            );
            self.last_reported = self.done;
        }
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
