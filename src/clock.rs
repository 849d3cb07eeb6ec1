//! Wall-clock source for marker lifetimes.
//!
//! Marker timestamps are unix milliseconds issued by the backend, so the
//! expiration countdown compares them against a wall clock rather than a
//! monotonic instant. Tests swap in a clock that follows tokio's virtual time.

/// Unix timestamp in milliseconds.
pub type Timestamp = i64;

pub trait Clock: Send + Sync {
    /// Current time as unix milliseconds.
    fn now_ms(&self) -> Timestamp;
}

/// Clock backed by the operating system's UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        #[allow(clippy::cast_possible_truncation)]
        {
            (nanos / 1_000_000) as Timestamp
        }
    }
}
