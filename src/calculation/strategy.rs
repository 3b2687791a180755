//! Closed-library strategies.
//!
//! A strategy takes the due date a policy asked for and the timetable around
//! it, and moves the date out of closed time. Every variant returns a
//! requested date that already falls in open time unchanged, except
//! [`ClosedLibraryStrategy::KeepCurrentDate`], which always normalizes to the
//! end of the day.
//!
//! Which variant runs is decided by [`determine_closed_library_strategy`]
//! from the loan policy, and by [`determine_strategy_for_moving_backward`]
//! when a due date has to be pulled back under a limit.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{EngineError, EngineResult};
use crate::models::{DueDateManagement, LoanPolicy, Period, end_of_day, local_date};

use super::timetable::{IntervalRef, LibraryTimetable};

/// The closed set of closed-library strategies.
///
/// Each variant carries only what it needs: a zone, a "now" snapshot or an
/// opening-time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedLibraryStrategy {
    /// Due at 23:59:59 of the requested local date, open or not.
    KeepCurrentDate {
        /// Zone defining the local date.
        zone: Tz,
    },
    /// Due exactly when requested.
    KeepCurrentDateTime,
    /// Due at the closing time of the nearest earlier open interval.
    MoveToEndOfPreviousOpenDay,
    /// Due at the last closing time of the next open day.
    MoveToEndOfNextOpenDay,
    /// Due when the service point next opens, plus an optional offset.
    MoveToBeginningOfNextOpenServicePointHours {
        /// Added to the opening time, clamped to that interval's closing time.
        offset: Option<Period>,
    },
    /// Due at the end of the service point hours current at `now`.
    EndOfCurrentHours {
        /// The moment of checkout or renewal.
        now: DateTime<Utc>,
    },
}

impl ClosedLibraryStrategy {
    /// Stable identifier used in logs and audit steps.
    pub fn name(&self) -> &'static str {
        match self {
            ClosedLibraryStrategy::KeepCurrentDate { .. } => "keep_current_date",
            ClosedLibraryStrategy::KeepCurrentDateTime => "keep_current_date_time",
            ClosedLibraryStrategy::MoveToEndOfPreviousOpenDay => "move_to_end_of_previous_open_day",
            ClosedLibraryStrategy::MoveToEndOfNextOpenDay => "move_to_end_of_next_open_day",
            ClosedLibraryStrategy::MoveToBeginningOfNextOpenServicePointHours { .. } => {
                "move_to_beginning_of_next_open_service_point_hours"
            }
            ClosedLibraryStrategy::EndOfCurrentHours { .. } => "end_of_current_hours",
        }
    }

    /// Whether the strategy looks at opening hours at all.
    ///
    /// The keep-current variants ignore the timetable, so callers can skip
    /// fetching calendar data for them.
    pub fn requires_calendar(&self) -> bool {
        !matches!(
            self,
            ClosedLibraryStrategy::KeepCurrentDate { .. } | ClosedLibraryStrategy::KeepCurrentDateTime
        )
    }

    /// Resolves `requested` against `timetable`.
    ///
    /// Fails with [`EngineError::CalendarOpenPeriodsNotFound`] when the
    /// timetable does not cover an instant the strategy needs, or has no open
    /// interval in the direction it walks.
    pub fn calculate_due_date(
        &self,
        requested: DateTime<Utc>,
        timetable: &LibraryTimetable,
    ) -> EngineResult<DateTime<Utc>> {
        match *self {
            ClosedLibraryStrategy::KeepCurrentDate { zone } => {
                end_of_day(zone, local_date(zone, requested))
            }
            ClosedLibraryStrategy::KeepCurrentDateTime => Ok(requested),
            ClosedLibraryStrategy::MoveToEndOfPreviousOpenDay => {
                end_of_previous_open_day(requested, timetable)
            }
            ClosedLibraryStrategy::MoveToEndOfNextOpenDay => {
                end_of_next_open_day(requested, timetable)
            }
            ClosedLibraryStrategy::MoveToBeginningOfNextOpenServicePointHours { offset } => {
                beginning_of_next_open_hours(requested, timetable, offset)
            }
            ClosedLibraryStrategy::EndOfCurrentHours { now } => {
                end_of_current_hours(requested, timetable, now)
            }
        }
    }
}

/// Picks the strategy for `policy`.
///
/// Rolling policies get exactly the mode they declare. Fixed-schedule due
/// dates already come from the schedule, so fixed policies stay in the
/// keep-current family: `KeepCurrentDateTime` is kept and every other mode
/// becomes [`ClosedLibraryStrategy::KeepCurrentDate`].
///
/// # Arguments
///
/// * `policy` - The loan policy governing the loan
/// * `now` - The moment of checkout or renewal, used by
///   [`ClosedLibraryStrategy::EndOfCurrentHours`]
/// * `zone` - The tenant zone defining local dates
///
/// # Returns
///
/// The strategy to run against the timetable.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::calculation::{ClosedLibraryStrategy, determine_closed_library_strategy};
/// use loan_due_date_engine::models::{DueDateManagement, LoanPolicy, Period};
/// use chrono::Utc;
/// use chrono_tz::Europe::London;
///
/// let policy = LoanPolicy::rolling("p", Period::weeks(3), DueDateManagement::MoveToEndOfNextOpenDay);
/// assert_eq!(
///     determine_closed_library_strategy(&policy, Utc::now(), London),
///     ClosedLibraryStrategy::MoveToEndOfNextOpenDay
/// );
/// ```
pub fn determine_closed_library_strategy(
    policy: &LoanPolicy,
    now: DateTime<Utc>,
    zone: Tz,
) -> ClosedLibraryStrategy {
    use DueDateManagement::*;

    if policy.is_fixed() {
        return match policy.due_date_management {
            KeepCurrentDateTime => ClosedLibraryStrategy::KeepCurrentDateTime,
            _ => ClosedLibraryStrategy::KeepCurrentDate { zone },
        };
    }

    match policy.due_date_management {
        KeepCurrentDate => ClosedLibraryStrategy::KeepCurrentDate { zone },
        KeepCurrentDateTime => ClosedLibraryStrategy::KeepCurrentDateTime,
        MoveToEndOfPreviousOpenDay => ClosedLibraryStrategy::MoveToEndOfPreviousOpenDay,
        MoveToEndOfNextOpenDay => ClosedLibraryStrategy::MoveToEndOfNextOpenDay,
        MoveToBeginningOfNextOpenServicePointHours => {
            ClosedLibraryStrategy::MoveToBeginningOfNextOpenServicePointHours {
                offset: policy.opening_time_offset,
            }
        }
        MoveToEndOfCurrentServicePointHours => ClosedLibraryStrategy::EndOfCurrentHours { now },
    }
}

/// Picks the strategy used to pull a due date back under a limit.
///
/// Short-term loans end with the current service point hours; everything
/// else moves to the end of the previous open day.
pub fn determine_strategy_for_moving_backward(
    policy: &LoanPolicy,
    now: DateTime<Utc>,
) -> ClosedLibraryStrategy {
    if policy.is_short_term() {
        ClosedLibraryStrategy::EndOfCurrentHours { now }
    } else {
        ClosedLibraryStrategy::MoveToEndOfPreviousOpenDay
    }
}

fn locate(timetable: &LibraryTimetable, instant: DateTime<Utc>) -> EngineResult<IntervalRef<'_>> {
    timetable
        .find_interval(instant)
        .ok_or(EngineError::CalendarOpenPeriodsNotFound { instant })
}

fn first_open<'a>(
    from: IntervalRef<'a>,
    step: impl Fn(&IntervalRef<'a>) -> Option<IntervalRef<'a>>,
) -> Option<IntervalRef<'a>> {
    let mut cursor = step(&from);
    while let Some(interval) = cursor {
        if interval.is_open() {
            return Some(interval);
        }
        cursor = step(&interval);
    }
    None
}

fn end_of_previous_open_day(
    requested: DateTime<Utc>,
    timetable: &LibraryTimetable,
) -> EngineResult<DateTime<Utc>> {
    let interval = locate(timetable, requested)?;
    if interval.is_open() {
        return Ok(requested);
    }
    first_open(interval, IntervalRef::previous)
        .map(|open| open.closing_time())
        .ok_or(EngineError::CalendarOpenPeriodsNotFound { instant: requested })
}

fn end_of_next_open_day(
    requested: DateTime<Utc>,
    timetable: &LibraryTimetable,
) -> EngineResult<DateTime<Utc>> {
    let interval = locate(timetable, requested)?;
    if interval.is_open() {
        return Ok(requested);
    }
    let mut last = first_open(interval, IntervalRef::next)
        .ok_or(EngineError::CalendarOpenPeriodsNotFound { instant: requested })?;

    // Later windows opening on the same local day extend that day.
    let zone = timetable.zone();
    let day = local_date(zone, last.start());
    while let Some(following) = first_open(last, IntervalRef::next) {
        if local_date(zone, following.start()) != day {
            break;
        }
        last = following;
    }
    Ok(last.closing_time())
}

fn beginning_of_next_open_hours(
    requested: DateTime<Utc>,
    timetable: &LibraryTimetable,
    offset: Option<Period>,
) -> EngineResult<DateTime<Utc>> {
    let interval = locate(timetable, requested)?;
    if interval.is_open() {
        return Ok(requested);
    }
    let next_open = first_open(interval, IntervalRef::next)
        .ok_or(EngineError::CalendarOpenPeriodsNotFound { instant: requested })?;

    let opening = next_open.start();
    match offset.filter(|o| !o.is_zero()) {
        None => Ok(opening),
        Some(offset) => {
            let zone = timetable.zone();
            let shifted = offset.plus_date(opening.with_timezone(&zone))?.with_timezone(&Utc);
            Ok(shifted.min(next_open.closing_time()))
        }
    }
}

fn end_of_current_hours(
    requested: DateTime<Utc>,
    timetable: &LibraryTimetable,
    now: DateTime<Utc>,
) -> EngineResult<DateTime<Utc>> {
    let interval = locate(timetable, requested)?;
    if interval.is_open() {
        return Ok(requested);
    }

    let current = locate(timetable, now)?;
    // A window carried over from the previous day is merged into one open
    // interval, so "now" inside it ends the loan when that window closes.
    if current.is_open() {
        return Ok(current.closing_time());
    }
    first_open(current, IntervalRef::next)
        .map(|open| open.closing_time())
        .ok_or(EngineError::CalendarOpenPeriodsNotFound { instant: now })
}
