//! Date and time utilities
//!
//! Persisted timestamps are UTC milliseconds. Day-level decisions (same day,
//! day buckets for sessions and analytics) use the calendar date of the
//! observer, which is whatever offset the `now` value carries.
//! - Day buckets: "YYYY-MM-DD"

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};

use crate::validation::ValidationError;

/// Milliseconds in a 24 hour window
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Source of the current time.
///
/// Injected into the tracker so streak and badge decisions stay deterministic
/// under test.
pub trait Clock: Send + Sync {
    /// Current instant, carrying the observer's UTC offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the system's local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock that always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Build a clock from a local date-time and a UTC offset in hours.
    ///
    /// Returns `None` for invalid dates or offsets.
    pub fn at(
        offset_hours: i32,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_hours * 3600)?;
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
        offset.from_local_datetime(&naive).single().map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Calendar date of `instant` as seen from the time zone of `observer`.
pub fn local_date_in<Tz: TimeZone>(instant: &DateTime<Utc>, observer: &DateTime<Tz>) -> NaiveDate {
    instant.with_timezone(&observer.timezone()).date_naive()
}

/// Whether `instant` falls on the same local calendar date as `now`.
pub fn is_same_local_date<Tz: TimeZone>(instant: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    local_date_in(instant, now) == now.date_naive()
}

/// Format a date as a day bucket string ("YYYY-MM-DD").
pub fn day_bucket(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a day bucket string back into a date.
pub fn parse_day_bucket(bucket: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(bucket, "%Y-%m-%d").ok()
}

/// Convert milliseconds since the epoch into a UTC timestamp.
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// Convert a stored millisecond timestamp, rejecting values chrono cannot represent.
pub fn stored_timestamp(field: &'static str, ms: i64) -> Result<DateTime<Utc>, ValidationError> {
    from_millis(ms).ok_or(ValidationError::StoredTimestamp { field, value: ms })
}
