//! Daily study streak tracking
//!
//! A streak counts consecutive qualifying days. Two different clocks decide a
//! transition: the "already counted today" check compares local calendar
//! dates, while the continue/break decision compares the raw elapsed time
//! against a 24 hour window. Studying at 23:59 and again at 00:01 extends the
//! streak; studying at 00:01 and then at 23:59 two days later breaks it.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{DAY_MS, is_same_local_date};

/// Persisted streak state for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakRecord {
    pub current_streak: u32,
    /// Never below `current_streak`
    pub longest_streak: u32,
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, owned by the store
    #[serde(default)]
    pub version: u64,
}

/// What a call to [`record_activity`] did to the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakOutcome {
    pub increased: bool,
    pub broken: bool,
}

/// Direction of a streak change, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    Increment,
    Reset,
}

impl StreakOutcome {
    pub const UNCHANGED: Self = Self {
        increased: false,
        broken: false,
    };
    pub const EXTENDED: Self = Self {
        increased: true,
        broken: false,
    };
    pub const RESTARTED: Self = Self {
        increased: true,
        broken: true,
    };

    pub fn change(&self) -> Option<StreakChange> {
        match (self.increased, self.broken) {
            (_, true) => Some(StreakChange::Reset),
            (true, false) => Some(StreakChange::Increment),
            (false, false) => None,
        }
    }
}

impl StreakRecord {
    /// Whether the streak can still be extended: the last activity is no more
    /// than 24 hours before `now`.
    pub fn is_active<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        match self.last_activity_at {
            Some(last) => {
                self.current_streak > 0
                    && now.with_timezone(&Utc).signed_duration_since(last).num_milliseconds() <= DAY_MS
            }
            None => false,
        }
    }
}

/// Apply one qualifying activity at `now` to `current`.
///
/// Exactly one branch applies:
/// - last activity on the same local date as `now`: unchanged
/// - no previous activity: streak starts at 1
/// - elapsed time of at most 24 hours: streak grows by 1
/// - otherwise: streak breaks and restarts at 1
///
/// `longest_streak` is raised to the new `current_streak` in every branch that
/// mutates the record.
pub fn record_activity<Tz: TimeZone>(
    current: &StreakRecord,
    now: &DateTime<Tz>,
) -> (StreakRecord, StreakOutcome) {
    let now_utc = now.with_timezone(&Utc);

    let (current_streak, outcome) = match current.last_activity_at {
        Some(last) if is_same_local_date(&last, now) => return (*current, StreakOutcome::UNCHANGED),
        None => (1, StreakOutcome::EXTENDED),
        Some(last) => {
            let elapsed_ms = now_utc.signed_duration_since(last).num_milliseconds();
            if elapsed_ms <= DAY_MS {
                (
                    current.current_streak.saturating_add(1),
                    StreakOutcome::EXTENDED,
                )
            } else {
                (1, StreakOutcome::RESTARTED)
            }
        }
    };

    let next = StreakRecord {
        current_streak,
        longest_streak: current.longest_streak.max(current_streak),
        last_activity_at: Some(now_utc),
        version: current.version,
    };
    (next, outcome)
}

/// Clear the current streak; the historical best is kept.
pub fn reset_streak(record: &StreakRecord) -> StreakRecord {
    StreakRecord {
        current_streak: 0,
        longest_streak: record.longest_streak,
        last_activity_at: None,
        version: record.version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap();
        FixedOffset::east_opt(0)
            .unwrap()
            .from_local_datetime(&naive)
            .unwrap()
    }

    fn record(current: u32, longest: u32, last: Option<DateTime<FixedOffset>>) -> StreakRecord {
        StreakRecord {
            current_streak: current,
            longest_streak: longest,
            last_activity_at: last.map(|t| t.with_timezone(&Utc)),
            version: 0,
        }
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let now = at(2024, 1, 1, 10, 0);
        let (next, outcome) = record_activity(&StreakRecord::default(), &now);

        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 1);
        assert_eq!(next.last_activity_at, Some(now.with_timezone(&Utc)));
        assert_eq!(outcome, StreakOutcome::EXTENDED);
    }

    #[test]
    fn test_within_24_hours_increments() {
        let start = record(5, 5, Some(at(2024, 1, 1, 10, 0)));
        let (next, outcome) = record_activity(&start, &at(2024, 1, 2, 9, 0));

        assert_eq!(next.current_streak, 6);
        assert_eq!(next.longest_streak, 6);
        assert!(outcome.increased);
        assert!(!outcome.broken);
    }

    #[test]
    fn test_gap_over_24_hours_breaks() {
        let start = record(5, 9, Some(at(2024, 1, 1, 10, 0)));
        let (next, outcome) = record_activity(&start, &at(2024, 1, 3, 11, 0));

        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 9);
        assert_eq!(outcome, StreakOutcome::RESTARTED);
        assert_eq!(outcome.change(), Some(StreakChange::Reset));
    }

    #[test]
    fn test_same_local_day_is_noop() {
        let start = record(3, 4, Some(at(2024, 1, 1, 0, 5)));
        let (next, outcome) = record_activity(&start, &at(2024, 1, 1, 23, 55));

        assert_eq!(next, start);
        assert_eq!(outcome, StreakOutcome::UNCHANGED);
        assert_eq!(outcome.change(), None);
    }

    #[test]
    fn test_midnight_crossing_counts_as_next_day() {
        let start = record(2, 2, Some(at(2024, 1, 1, 23, 59)));
        let (next, outcome) = record_activity(&start, &at(2024, 1, 2, 0, 1));

        assert_eq!(next.current_streak, 3);
        assert_eq!(outcome.change(), Some(StreakChange::Increment));
    }

    #[test]
    fn test_elapsed_time_not_calendar_days_decides_break() {
        // One calendar day apart on paper, but 47h58m elapsed
        let start = record(4, 4, Some(at(2024, 1, 1, 0, 1)));
        let (next, outcome) = record_activity(&start, &at(2024, 1, 2, 23, 59));

        assert_eq!(next.current_streak, 1);
        assert!(outcome.broken);
    }

    #[test]
    fn test_exactly_24_hours_still_increments() {
        let start = record(1, 1, Some(at(2024, 1, 1, 10, 0)));
        let (next, outcome) = record_activity(&start, &at(2024, 1, 2, 10, 0));

        assert_eq!(next.current_streak, 2);
        assert!(!outcome.broken);
    }

    #[test]
    fn test_same_day_check_uses_local_offset() {
        // 22:00 UTC Jan 1 is 00:00 Jan 2 at UTC+2; 08:00 Jan 2 at UTC+2 is the same local day
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let last = at(2024, 1, 1, 22, 0);
        let now = plus_two
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(8, 0, 0)
                    .unwrap(),
            )
            .unwrap();

        let start = record(7, 7, Some(last));
        let (next, outcome) = record_activity(&start, &now);
        assert_eq!(next, start);
        assert!(!outcome.increased);
    }

    #[test]
    fn test_longest_never_below_current() {
        let mut rec = StreakRecord::default();
        let mut now = at(2024, 3, 1, 9, 0);
        for _ in 0..10 {
            let before = rec.longest_streak;
            let (next, _) = record_activity(&rec, &now);
            assert!(next.longest_streak >= before);
            assert!(next.longest_streak >= next.current_streak);
            rec = next;
            now += chrono::Duration::hours(20);
        }
    }

    #[test]
    fn test_reset_keeps_longest() {
        let start = record(6, 10, Some(at(2024, 1, 1, 10, 0)));
        let reset = reset_streak(&start);

        assert_eq!(reset.current_streak, 0);
        assert_eq!(reset.longest_streak, 10);
        assert_eq!(reset.last_activity_at, None);
    }

    #[test]
    fn test_is_active() {
        let rec = record(2, 2, Some(at(2024, 1, 1, 10, 0)));
        assert!(rec.is_active(&at(2024, 1, 2, 9, 0)));
        assert!(!rec.is_active(&at(2024, 1, 3, 9, 0)));
        assert!(!StreakRecord::default().is_active(&at(2024, 1, 1, 9, 0)));
    }
}
