use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::error::Stopped;

/// Longest gap between two looks at the stop flag.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Flags {
    stopped: AtomicBool,
    paused: AtomicBool,
}

/// Cooperative stop/pause token shared between a run and whoever controls it.
///
/// Every suspension point of a run goes through [`RunControl::checkpoint`] or
/// [`RunControl::sleep`], so a stop request is observed within one poll
/// interval and a pause holds the run at the next checkpoint.
#[derive(Clone)]
pub struct RunControl {
    flags: Arc<Flags>,
    poll: Duration,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new(MAX_POLL_INTERVAL)
    }
}

impl RunControl {
    pub fn new(poll: Duration) -> Self {
        Self {
            flags: Arc::new(Flags {
                stopped: AtomicBool::new(false),
                paused: AtomicBool::new(false),
            }),
            poll: poll.clamp(Duration::from_millis(1), MAX_POLL_INTERVAL),
        }
    }

    pub fn stop(&self) {
        self.flags.stopped.store(true, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.flags.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stopped.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll
    }

    /// Block while paused; fail once a stop has been requested.
    pub fn checkpoint(&self) -> Result<(), Stopped> {
        loop {
            if self.is_stopped() {
                return Err(Stopped);
            }
            if !self.is_paused() {
                return Ok(());
            }
            thread::sleep(self.poll);
        }
    }

    /// Sleep for `duration`, polling the flags. Time spent paused does not
    /// count toward the duration.
    pub fn sleep(&self, duration: Duration) -> Result<(), Stopped> {
        let mut remaining = duration;
        loop {
            self.checkpoint()?;
            if remaining.is_zero() {
                return Ok(());
            }
            let step = remaining.min(self.poll);
            thread::sleep(step);
            remaining -= step;
        }
    }
}
