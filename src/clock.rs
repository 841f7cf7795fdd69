use chrono::{Local, Timelike};
use std::time::{Duration, Instant};

pub fn local_minutes() -> u32 {
    minutes_since_midnight(&Local::now())
}

pub fn minutes_since_midnight<T: Timelike>(time: &T) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Fixed-interval timer owned by the shell's event loop. It fires once
/// immediately, then every `interval`, until cancelled.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
    cancelled: bool,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Ticker {
            interval,
            next_due: None,
            cancelled: false,
        }
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if self.cancelled {
            return false;
        }
        match self.next_due {
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now + self.interval);
                true
            }
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.next_due {
            Some(due) => due.saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    pub fn resync(&mut self) {
        self.next_due = None;
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
