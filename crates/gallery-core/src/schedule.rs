//! Rate limiting for viewport events, driven by timestamps the host supplies.

use std::time::Duration;
use std::time::Instant;

/// Coalesces bursts of requests into at most one run per `interval` (one animation frame by
/// default). Requests only mark work as pending; the host's frame callback polls.
#[derive(Clone, Debug)]
pub struct FrameThrottle {
    interval: Duration,
    last_run: Option<Instant>,
    pending: bool,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            pending: false,
        }
    }

    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns `true` when pending work should run now.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        let ready = self
            .last_run
            .map(|last| now.saturating_duration_since(last) >= self.interval)
            .unwrap_or(true);
        if ready {
            self.pending = false;
            self.last_run = Some(now);
        }
        ready
    }

    pub fn cancel(&mut self) {
        self.pending = false;
    }
}

/// Fires once input has been quiet for `quiet`.
#[derive(Clone, Debug)]
pub struct Debounce {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
