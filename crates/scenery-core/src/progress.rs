//! Progress reporting with cooperative cancellation.
//!
//! Long operators call [`Progress::report`] with a stage index, the stage
//! count, a message and a completion fraction. A `true` return asks the
//! operator to stop; [`checkpoint`] turns that into `SceneryError::Cancelled`.

use tracing::info;

use crate::error::{Result, SceneryError};

pub trait Progress {
    /// Report progress. Returns true to request cancellation.
    fn report(&mut self, stage: usize, total_stages: usize, message: &str, fraction: f64) -> bool;
}

impl<F> Progress for F
where
    F: FnMut(usize, usize, &str, f64) -> bool,
{
    fn report(&mut self, stage: usize, total_stages: usize, message: &str, fraction: f64) -> bool {
        self(stage, total_stages, message, fraction)
    }
}

/// Ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _: usize, _: usize, _: &str, _: f64) -> bool {
        false
    }
}

/// Logs stage boundaries through `tracing`. Never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn report(&mut self, stage: usize, total_stages: usize, message: &str, fraction: f64) -> bool {
        if fraction <= 0.0 || fraction >= 1.0 {
            info!("[{}/{}] {message} {:.0}%", stage + 1, total_stages, fraction * 100.0);
        }
        false
    }
}

/// Report progress and convert a cancel request into an error.
pub fn checkpoint(
    progress: &mut dyn Progress,
    stage: usize,
    total_stages: usize,
    message: &str,
    fraction: f64,
) -> Result<()> {
    if progress.report(stage, total_stages, message, fraction) {
        Err(SceneryError::Cancelled)
    } else {
        Ok(())
    }
}

/// Throttles per-item reports to roughly one hundred per stage.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    total: usize,
    step: usize,
}

impl Ticker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            step: (total / 100).max(1),
        }
    }

    /// Report item `i` if it falls on a tick boundary.
    pub fn tick(
        &self,
        progress: &mut dyn Progress,
        stage: usize,
        total_stages: usize,
        message: &str,
        i: usize,
    ) -> Result<()> {
        if i % self.step == 0 {
            let fraction = if self.total == 0 { 1.0 } else { i as f64 / self.total as f64 };
            checkpoint(progress, stage, total_stages, message, fraction)?;
        }
        Ok(())
    }
}
