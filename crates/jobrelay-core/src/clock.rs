use chrono::{DateTime, Utc};

/// Injectable source of the current UTC instant.
///
/// Every timestamp read in the Queue Protocol goes through this trait
/// rather than calling `Utc::now()` directly, so reaper timing can be
/// made deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
