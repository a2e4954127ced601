//! Time source shared by the quote cache and the aggregators.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveTime, TimeDelta};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    /// Current instant in the server's local offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Seconds left until the next local midnight, never less than one.
pub fn seconds_until_end_of_day(now: &DateTime<FixedOffset>) -> u64 {
    let midnight = now
        .date_naive()
        .succ_opt()
        .map(|tomorrow| tomorrow.and_time(NaiveTime::MIN))
        .and_then(|next| next.and_local_timezone(*now.offset()).single());

    match midnight {
        Some(midnight) => {
            let remaining: TimeDelta = midnight - *now;
            remaining.num_seconds().max(1) as u64
        }
        None => 1,
    }
}
