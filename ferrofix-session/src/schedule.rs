/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-session time windows.
//!
//! A schedule answers two questions for the session core:
//! - is an instant inside the configured trading window?
//! - do two instants fall inside the *same* window occurrence?
//!
//! The second drives day-rollover resets: when the store's creation time and
//! now are in range but belong to different occurrences, a new trading day
//! has started and the session counters reset.
//!
//! Windows are daily (start/end times, possibly wrapping midnight) or weekly
//! (start/end day plus times). Times are interpreted in a fixed UTC offset;
//! an unconfigured schedule is always open.

use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, FixedOffset, NaiveTime, TimeZone, Utc, Weekday,
};

/// Seconds in a day, for weekly window arithmetic.
const DAY_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy)]
struct Window {
    start: NaiveTime,
    end: NaiveTime,
    /// Present on weekly windows; `start_day` and `end_day` come together.
    start_day: Option<Weekday>,
    end_day: Option<Weekday>,
    offset: FixedOffset,
}

/// The session's in-session time window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSchedule {
    window: Option<Window>,
}

impl SessionSchedule {
    /// A schedule with no window: always in session, never rolls over.
    #[must_use]
    pub const fn always_open() -> Self {
        Self { window: None }
    }

    /// A daily window between `start` and `end`, interpreted at `offset`.
    /// `end < start` wraps past midnight.
    #[must_use]
    pub const fn daily(start: NaiveTime, end: NaiveTime, offset: FixedOffset) -> Self {
        Self {
            window: Some(Window {
                start,
                end,
                start_day: None,
                end_day: None,
                offset,
            }),
        }
    }

    /// A weekly window from (`start_day`, `start`) to (`end_day`, `end`).
    #[must_use]
    pub const fn weekly(
        start: NaiveTime,
        end: NaiveTime,
        start_day: Weekday,
        end_day: Weekday,
        offset: FixedOffset,
    ) -> Self {
        Self {
            window: Some(Window {
                start,
                end,
                start_day: Some(start_day),
                end_day: Some(end_day),
                offset,
            }),
        }
    }

    /// Returns true if `now` is inside the window.
    #[must_use]
    pub fn is_in_range(&self, now: DateTime<Utc>) -> bool {
        let Some(w) = &self.window else {
            return true;
        };
        let local = now.with_timezone(&w.offset);

        match (w.start_day, w.end_day) {
            (Some(start_day), Some(end_day)) => {
                let pos = week_pos(local.weekday(), local.time());
                let start = week_pos(start_day, w.start);
                let end = week_pos(end_day, w.end);
                if start <= end {
                    pos >= start && pos <= end
                } else {
                    pos >= start || pos <= end
                }
            }
            _ => {
                let t = local.time();
                if w.start <= w.end {
                    t >= w.start && t <= w.end
                } else {
                    t >= w.start || t <= w.end
                }
            }
        }
    }

    /// Returns true if `a` and `b` are both in range and inside the same
    /// window occurrence.
    #[must_use]
    pub fn is_in_same_range(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        if self.window.is_none() {
            return true;
        }
        if !self.is_in_range(a) || !self.is_in_range(b) {
            return false;
        }
        match (self.occurrence_start(a), self.occurrence_start(b)) {
            (Some(sa), Some(sb)) => sa == sb,
            _ => false,
        }
    }

    /// Returns the instant this window occurrence opened, for an in-range
    /// instant.
    fn occurrence_start(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let w = self.window.as_ref()?;
        let local = t.with_timezone(&w.offset);

        let (date, start_time) = match w.start_day {
            Some(start_day) => {
                let days_back = i64::from(
                    (local.weekday().num_days_from_monday() + 7 - start_day.num_days_from_monday())
                        % 7,
                );
                let mut date = local.date_naive() - ChronoDuration::days(days_back);
                if days_back == 0 && local.time() < w.start {
                    date -= ChronoDuration::days(7);
                }
                (date, w.start)
            }
            None => {
                let date = if w.start <= w.end || local.time() >= w.start {
                    local.date_naive()
                } else {
                    // Wrapped window entered before midnight yesterday.
                    local.date_naive() - ChronoDuration::days(1)
                };
                (date, w.start)
            }
        };

        w.offset
            .from_local_datetime(&date.and_time(start_time))
            .single()
            .map(|dt| dt.to_utc())
    }
}

fn week_pos(day: Weekday, time: NaiveTime) -> i64 {
    i64::from(day.num_days_from_monday()) * DAY_SECS
        + i64::from(time.signed_duration_since(NaiveTime::MIN).num_seconds())
}
