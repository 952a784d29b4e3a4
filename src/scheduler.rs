//! Fixed-interval pass scheduler.
//!
//! Runs one pass immediately, then one per interval until the stop flag is
//! raised. Passes never overlap: the next wait starts after a pass returns.
//! The wait is sliced so a stop request is noticed within one tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_TICK: Duration = Duration::from_secs(1);

pub struct IntervalScheduler {
    interval: Duration,
    stop: Arc<AtomicBool>,
    tick: Duration,
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        Self::with_stop_flag(interval, Arc::new(AtomicBool::new(false)))
    }

    pub fn with_stop_flag(interval: Duration, stop: Arc<AtomicBool>) -> Self {
        Self {
            interval,
            stop,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn from_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Shared flag; storing `true` stops the loop after the current pass.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Run `pass` until stopped. The closure receives the pass number
    /// (starting at 1). Returns the number of passes run.
    pub fn run<F: FnMut(u64)>(&self, mut pass: F) -> u64 {
        let mut count = 0;
        while !self.is_stopped() {
            count += 1;
            tracing::debug!(pass = count, "starting pass");
            pass(count);
            if !self.sleep_interval() {
                break;
            }
        }
        tracing::info!(passes = count, "scheduler stopped");
        count
    }

    /// Returns false if the stop flag was raised during the wait.
    fn sleep_interval(&self) -> bool {
        let deadline = Instant::now() + self.interval;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(self.tick.min(deadline - now));
        }
    }
}
