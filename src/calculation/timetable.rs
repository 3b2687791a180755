//! Library timetable: a continuous line of open and closed intervals.
//!
//! The timetable is stitched together from the previous, requested and next
//! opening days. Open windows that touch (a window that runs to midnight and
//! one that starts at midnight the next day) are merged, so a rollover is a
//! single open interval. Every gap between open windows becomes a closed
//! interval, which makes the intervals contiguous and alternating.
//!
//! Intervals live in a `Vec` and navigation is by index through
//! [`IntervalRef`], so there are no links to maintain.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::error::EngineResult;
use crate::models::{AdjacentOpeningDays, OpeningDay, start_of_day};

/// A half-open `[start, end)` span during which the service point is either
/// open or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryInterval {
    /// First instant of the span.
    pub start: DateTime<Utc>,
    /// First instant after the span.
    pub end: DateTime<Utc>,
    /// Whether the service point is open.
    pub open: bool,
}

impl LibraryInterval {
    /// Whether `instant` lies in the span.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Ordered, contiguous open/closed intervals for one calculation.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::calculation::LibraryTimetable;
/// use loan_due_date_engine::models::{AdjacentOpeningDays, OpeningDay, OpeningHour};
/// use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
/// use chrono_tz::Tz;
///
/// let d = |day| NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
/// let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
/// let open = |day| OpeningDay::with_hours(d(day), Tz::UTC, vec![OpeningHour::new(t(9), t(17))]);
///
/// let days = AdjacentOpeningDays::new(open(15), open(16), open(19));
/// let timetable = LibraryTimetable::from_adjacent_days(&days).unwrap();
///
/// let saturday_noon = Utc.with_ymd_and_hms(2026, 1, 17, 12, 0, 0).unwrap();
/// let interval = timetable.find_interval(saturday_noon).unwrap();
/// assert!(!interval.is_open());
/// assert_eq!(interval.next().unwrap().start(), Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTimetable {
    intervals: Vec<LibraryInterval>,
    zone: Tz,
}

impl LibraryTimetable {
    /// A timetable with no intervals, for strategies that never look up
    /// opening hours.
    pub fn empty(zone: Tz) -> Self {
        Self {
            intervals: Vec::new(),
            zone,
        }
    }

    /// Builds the timetable for the three adjacent days.
    pub fn from_adjacent_days(days: &AdjacentOpeningDays) -> EngineResult<Self> {
        Self::from_opening_days(days.days(), days.zone())
    }

    /// Builds a timetable covering every date in `days`, from the start of the
    /// earliest date to the end of the latest one.
    pub fn from_opening_days<'a>(
        days: impl IntoIterator<Item = &'a OpeningDay>,
        zone: Tz,
    ) -> EngineResult<Self> {
        let days: Vec<&OpeningDay> = days.into_iter().collect();
        let (Some(first), Some(last)) = (
            days.iter().map(|d| d.date).min(),
            days.iter().map(|d| d.date).max(),
        ) else {
            return Ok(Self::empty(zone));
        };

        let mut open = Vec::new();
        for day in days {
            open.extend(day.open_intervals()?);
        }
        let open = merge_touching(open);

        let coverage_start = start_of_day(zone, first)?;
        let mut coverage_end = match last.succ_opt() {
            Some(following) => start_of_day(zone, following)?,
            None => start_of_day(zone, last)?,
        };
        if let Some((_, end)) = open.last() {
            coverage_end = coverage_end.max(*end);
        }

        let mut intervals = Vec::with_capacity(open.len() * 2 + 1);
        let mut cursor = coverage_start.min(open.first().map_or(coverage_start, |(s, _)| *s));
        for (start, end) in open {
            if start > cursor {
                intervals.push(LibraryInterval {
                    start: cursor,
                    end: start,
                    open: false,
                });
            }
            intervals.push(LibraryInterval {
                start,
                end,
                open: true,
            });
            cursor = end;
        }
        if cursor < coverage_end {
            intervals.push(LibraryInterval {
                start: cursor,
                end: coverage_end,
                open: false,
            });
        }

        Ok(Self { intervals, zone })
    }

    /// The zone closing times are expressed in.
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// All intervals, in order.
    pub fn intervals(&self) -> &[LibraryInterval] {
        &self.intervals
    }

    /// Whether the timetable has no intervals at all.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The interval containing `instant`, or `None` when it lies outside the
    /// timetable.
    pub fn find_interval(&self, instant: DateTime<Utc>) -> Option<IntervalRef<'_>> {
        let index = self.intervals.partition_point(|i| i.end <= instant);
        self.intervals
            .get(index)
            .filter(|i| i.contains(instant))
            .map(|_| IntervalRef {
                timetable: self,
                index,
            })
    }

    /// The due time for an interval's end: 23:59:59 when the interval ends at
    /// local midnight, otherwise the end itself.
    pub fn closing_time(&self, interval: &LibraryInterval) -> DateTime<Utc> {
        let local = interval.end.with_timezone(&self.zone);
        if local.time() == NaiveTime::MIN {
            interval.end - TimeDelta::seconds(1)
        } else {
            interval.end
        }
    }
}

/// Borrowed position in a [`LibraryTimetable`] that can step to its neighbours.
#[derive(Debug, Clone, Copy)]
pub struct IntervalRef<'a> {
    timetable: &'a LibraryTimetable,
    index: usize,
}

impl<'a> IntervalRef<'a> {
    /// The interval itself.
    pub fn interval(&self) -> &'a LibraryInterval {
        &self.timetable.intervals[self.index]
    }

    /// The preceding interval.
    pub fn previous(&self) -> Option<IntervalRef<'a>> {
        self.index.checked_sub(1).map(|index| IntervalRef {
            timetable: self.timetable,
            index,
        })
    }

    /// The following interval.
    pub fn next(&self) -> Option<IntervalRef<'a>> {
        (self.index + 1 < self.timetable.intervals.len()).then(|| IntervalRef {
            timetable: self.timetable,
            index: self.index + 1,
        })
    }

    /// Whether the service point is open during the interval.
    pub fn is_open(&self) -> bool {
        self.interval().open
    }

    /// Start of the interval.
    pub fn start(&self) -> DateTime<Utc> {
        self.interval().start
    }

    /// End of the interval.
    pub fn end(&self) -> DateTime<Utc> {
        self.interval().end
    }

    /// See [`LibraryTimetable::closing_time`].
    pub fn closing_time(&self) -> DateTime<Utc> {
        self.timetable.closing_time(self.interval())
    }
}

pub(crate) fn merge_touching(
    mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    spans.sort_by_key(|(start, _)| *start);
    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}
