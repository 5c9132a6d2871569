//! Progress and ETA reporting for split runs
//!
//! The engine emits a [`ProgressUpdate`] after every input line. Reporters must
//! never fail the run, so [`ProgressReporter::report`] has no error channel.

use std::io::Write;
use std::time::{Duration, Instant};
use tracing::debug;

/// State passed to a reporter after each processed line
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate<'a> {
    pub bytes_done: u64,
    pub bytes_total: u64,
    pub started_at: Instant,
    /// Routing key of the most recent record, empty before the first one
    pub current_key: &'a str,
}

pub trait ProgressReporter {
    fn report(&mut self, update: &ProgressUpdate<'_>);

    /// Called once when the run completes or aborts
    fn finish(&mut self) {}
}

/// Percentage done and remaining time, extrapolated linearly from bytes processed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub percent: f64,
    /// `None` until at least one byte has been processed
    pub remaining: Option<Duration>,
}

pub fn estimate(bytes_done: u64, bytes_total: u64, elapsed: Duration) -> Estimate {
    if bytes_total == 0 {
        return Estimate {
            percent: 100.0,
            remaining: Some(Duration::ZERO),
        };
    }

    let percent = bytes_done as f64 / bytes_total as f64 * 100.0;
    if bytes_done == 0 {
        return Estimate {
            percent,
            remaining: None,
        };
    }

    let per_byte = elapsed.as_secs_f64() / bytes_done as f64;
    let expected_total = per_byte * bytes_total as f64;
    let remaining = (expected_total - elapsed.as_secs_f64()).max(0.0);

    Estimate {
        percent,
        remaining: Some(Duration::from_secs_f64(remaining)),
    }
}

/// Renders a single, continuously rewritten status line
pub struct TerminalReporter<W: Write> {
    out: W,
    broken: bool,
}

impl<W: Write> TerminalReporter<W> {
    pub fn new(out: W) -> Self {
        TerminalReporter { out, broken: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, update: &ProgressUpdate<'_>, elapsed: Duration) -> std::io::Result<()> {
        let est = estimate(update.bytes_done, update.bytes_total, elapsed);
        let eta = match est.remaining {
            Some(left) => format!("{:>6}s", left.as_secs()),
            None => format!("{:>7}", "?"),
        };
        // cursor up one line, then clear it
        writeln!(
            self.out,
            "\x1b[A\r\x1b[0KProcessing... ({:>6.2}% ) [ETA: {}] {}",
            est.percent, eta, update.current_key
        )?;
        self.out.flush()
    }
}

impl<W: Write> ProgressReporter for TerminalReporter<W> {
    fn report(&mut self, update: &ProgressUpdate<'_>) {
        if self.broken {
            return;
        }
        if let Err(err) = self.render(update, update.started_at.elapsed()) {
            debug!(error = %err, "progress output disabled");
            self.broken = true;
        }
    }
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&mut self, _update: &ProgressUpdate<'_>) {}
}
