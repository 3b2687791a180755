//! Opening-hours records supplied by the calendar provider.
//!
//! An [`OpeningDay`] describes one calendar date at one service point: whether
//! it is open at all, whether it is open around the clock, and otherwise the
//! [`OpeningHour`] windows it is open for. [`AdjacentOpeningDays`] bundles the
//! requested date with the nearest open days on either side, which is all the
//! data the closed-library strategies need.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

use super::zoned::resolve_local;

/// One open window within a day, in local time.
///
/// An end time of 23:59 or later means the service point stays open until
/// midnight. An end time earlier than the start time means the window runs
/// past midnight into the following date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHour {
    /// Local opening time.
    pub start_time: NaiveTime,
    /// Local closing time.
    pub end_time: NaiveTime,
}

impl OpeningHour {
    /// Creates an opening window.
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Places the window on `date`, returning local `[start, end)`.
    ///
    /// Returns `None` for an empty window.
    pub fn local_window(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = date.and_time(self.start_time);
        let next_midnight = date.succ_opt()?.and_time(NaiveTime::MIN);

        let end = if self.end_time >= almost_midnight() {
            next_midnight
        } else if self.end_time < self.start_time {
            next_midnight + (self.end_time - NaiveTime::MIN)
        } else {
            date.and_time(self.end_time)
        };

        (end > start).then_some((start, end))
    }
}

fn almost_midnight() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

/// Calendar record for a single date at a service point.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::models::{OpeningDay, OpeningHour};
/// use chrono::{NaiveDate, NaiveTime};
/// use chrono_tz::Europe::London;
///
/// let day = OpeningDay::with_hours(
///     NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(),
///     London,
///     vec![OpeningHour::new(
///         NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
///         NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
///     )],
/// );
/// assert!(day.is_open());
/// assert_eq!(day.open_minutes(), 480);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningDay {
    /// The calendar date.
    pub date: NaiveDate,
    /// Whether the service point is open for the whole day.
    #[serde(default)]
    pub all_day: bool,
    /// Whether the service point opens at all on this date.
    pub open: bool,
    /// Open windows, ignored when `all_day` is set.
    #[serde(default, rename = "openingHour")]
    pub hours: Vec<OpeningHour>,
    /// The zone the local times are expressed in.
    pub zone: Tz,
}

impl OpeningDay {
    /// A day on which the service point is closed.
    pub fn closed(date: NaiveDate, zone: Tz) -> Self {
        Self {
            date,
            all_day: false,
            open: false,
            hours: Vec::new(),
            zone,
        }
    }

    /// A day on which the service point is open around the clock.
    pub fn all_day(date: NaiveDate, zone: Tz) -> Self {
        Self {
            date,
            all_day: true,
            open: true,
            hours: Vec::new(),
            zone,
        }
    }

    /// A day with explicit opening windows. No windows means closed.
    pub fn with_hours(date: NaiveDate, zone: Tz, mut hours: Vec<OpeningHour>) -> Self {
        hours.sort_by_key(|h| h.start_time);
        Self {
            date,
            all_day: false,
            open: !hours.is_empty(),
            hours,
            zone,
        }
    }

    /// Whether the day has any open time.
    pub fn is_open(&self) -> bool {
        self.open && (self.all_day || !self.open_windows().is_empty())
    }

    /// Open windows as local `[start, end)` pairs, ordered by start.
    pub fn open_windows(&self) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        if !self.open {
            return Vec::new();
        }
        if self.all_day {
            let start = self.date.and_time(NaiveTime::MIN);
            return vec![(start, start + TimeDelta::days(1))];
        }

        let mut windows: Vec<_> = self
            .hours
            .iter()
            .filter_map(|h| h.local_window(self.date))
            .collect();
        windows.sort_by_key(|(start, _)| *start);
        windows
    }

    /// Open windows resolved to instants in the day's zone.
    pub fn open_intervals(&self) -> EngineResult<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
        self.open_windows()
            .into_iter()
            .map(|(start, end)| Ok((resolve_local(self.zone, start)?, resolve_local(self.zone, end)?)))
            .collect()
    }

    /// Total minutes of open time on the day's local clock.
    pub fn open_minutes(&self) -> i64 {
        self.open_windows()
            .iter()
            .map(|(start, end)| (*end - *start).num_minutes())
            .sum()
    }
}

/// The requested day together with the nearest open days around it.
///
/// `previous` and `next` are the closest open days before and after the
/// requested date. When the calendar has no open day in a direction the
/// provider supplies a closed record instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjacentOpeningDays {
    /// Nearest open day before the requested date.
    #[serde(rename = "previousDay")]
    pub previous: OpeningDay,
    /// The requested date.
    #[serde(rename = "openingDay")]
    pub requested: OpeningDay,
    /// Nearest open day after the requested date.
    #[serde(rename = "nextDay")]
    pub next: OpeningDay,
}

impl AdjacentOpeningDays {
    /// Bundles three days.
    pub fn new(previous: OpeningDay, requested: OpeningDay, next: OpeningDay) -> Self {
        Self {
            previous,
            requested,
            next,
        }
    }

    /// The three days in chronological order.
    pub fn days(&self) -> [&OpeningDay; 3] {
        [&self.previous, &self.requested, &self.next]
    }

    /// The zone of the requested day.
    pub fn zone(&self) -> Tz {
        self.requested.zone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::London;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn local(d: &str, h: u32, m: u32) -> NaiveDateTime {
        date(d).and_time(time(h, m))
    }

    #[test]
    fn test_closing_at_2359_means_midnight() {
        let hour = OpeningHour::new(time(20, 0), time(23, 59));
        assert_eq!(
            hour.local_window(date("2026-01-16")),
            Some((local("2026-01-16", 20, 0), local("2026-01-17", 0, 0)))
        );
    }

    #[test]
    fn test_end_before_start_runs_past_midnight() {
        let hour = OpeningHour::new(time(20, 0), time(2, 0));
        assert_eq!(
            hour.local_window(date("2026-01-16")),
            Some((local("2026-01-16", 20, 0), local("2026-01-17", 2, 0)))
        );
    }

    #[test]
    fn test_empty_window_is_dropped() {
        let hour = OpeningHour::new(time(9, 0), time(9, 0));
        assert_eq!(hour.local_window(date("2026-01-16")), None);
    }

    #[test]
    fn test_all_day_covers_24_hours() {
        let day = OpeningDay::all_day(date("2026-01-16"), London);
        assert!(day.is_open());
        assert_eq!(day.open_minutes(), 1_440);
    }

    #[test]
    fn test_closed_day_has_no_windows() {
        let mut day = OpeningDay::closed(date("2026-01-17"), London);
        day.hours.push(OpeningHour::new(time(9, 0), time(17, 0)));
        assert!(!day.is_open());
        assert!(day.open_windows().is_empty());
    }

    #[test]
    fn test_windows_are_sorted() {
        let day = OpeningDay::with_hours(
            date("2026-01-16"),
            London,
            vec![
                OpeningHour::new(time(13, 0), time(17, 0)),
                OpeningHour::new(time(9, 0), time(12, 0)),
            ],
        );
        let windows = day.open_windows();
        assert_eq!(windows[0].0, local("2026-01-16", 9, 0));
        assert_eq!(windows[1].0, local("2026-01-16", 13, 0));
        assert_eq!(day.open_minutes(), 420);
    }

    #[test]
    fn test_deserializes_calendar_json() {
        let json = r#"{
            "date": "2026-01-16",
            "allDay": false,
            "open": true,
            "openingHour": [{"startTime": "08:00:00", "endTime": "20:00:00"}],
            "zone": "Europe/London"
        }"#;
        let day: OpeningDay = serde_json::from_str(json).unwrap();
        assert_eq!(day.zone, London);
        assert_eq!(day.hours.len(), 1);
        assert_eq!(day.open_minutes(), 720);
    }
}
