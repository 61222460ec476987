//! Wall-clock capability.
//!
//! All duration math in the timer goes through a [`Clock`] so that the engine
//! can be driven deterministically in tests and simulations.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Source of the current wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
///
/// Cloning shares the underlying instant, so a test can keep one handle and
/// give another to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance_ms(minutes * MILLIS_PER_MINUTE);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Convert epoch milliseconds to a UTC timestamp, falling back to the epoch
/// for values chrono cannot represent.
pub fn to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Local calendar day containing the given instant.
pub fn local_date(ms: i64) -> NaiveDate {
    to_utc(ms).with_timezone(&Local).date_naive()
}

/// Local calendar day (`YYYY-MM-DD`) containing the given instant.
pub fn date_key(ms: i64) -> String {
    format_date_key(local_date(ms))
}

pub fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_shares_time_between_clones() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance_secs(2);
        assert_eq!(clock.now_ms(), 3_000);
        handle.advance_minutes(1);
        assert_eq!(clock.now_ms(), 63_000);
        clock.set(5);
        assert_eq!(handle.now_ms(), 5);
    }

    #[test]
    fn date_key_is_iso_day() {
        let ms = 1_700_000_000_000;
        let key = date_key(ms);
        assert_eq!(key.len(), 10);
        assert_eq!(&key[4..5], "-");
        let expected = Local.timestamp_millis_opt(ms).unwrap();
        assert_eq!(key, expected.format("%Y-%m-%d").to_string());
    }
}
