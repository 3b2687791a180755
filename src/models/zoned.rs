//! Conversions between instants and local calendar times.
//!
//! Calendar data is expressed in local dates and times of a service point's
//! zone while due dates are instants. These helpers do the translation and
//! settle the two awkward cases of daylight-saving transitions: a local time
//! inside a spring-forward gap is moved one hour later, and an ambiguous local
//! time resolves to its earliest instant.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{EngineError, EngineResult};

/// Resolves a local date-time in `zone` to an instant.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::models::resolve_local;
/// use chrono::NaiveDate;
/// use chrono_tz::America::New_York;
///
/// // 02:30 does not exist on 2026-03-08 in New York, it becomes 03:30 EDT.
/// let local = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap().and_hms_opt(2, 30, 0).unwrap();
/// let instant = resolve_local(New_York, local).unwrap();
/// assert_eq!(instant.to_rfc3339(), "2026-03-08T07:30:00+00:00");
/// ```
pub fn resolve_local(zone: Tz, local: NaiveDateTime) -> EngineResult<DateTime<Utc>> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let shifted = local + TimeDelta::hours(1);
            zone.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| EngineError::InvalidLocalTime {
                    local,
                    zone: zone.name().to_string(),
                })
        }
    }
}

/// Returns the local calendar date of `instant` in `zone`.
pub fn local_date(zone: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

/// Returns the local date-time of `instant` in `zone`.
pub fn local_date_time(zone: Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&zone).naive_local()
}

/// Returns the first instant of `date` in `zone`.
pub fn start_of_day(zone: Tz, date: NaiveDate) -> EngineResult<DateTime<Utc>> {
    resolve_local(zone, date.and_time(NaiveTime::MIN))
}

/// Returns 23:59:59 of `date` in `zone`, the conventional end of a loan day.
pub fn end_of_day(zone: Tz, date: NaiveDate) -> EngineResult<DateTime<Utc>> {
    resolve_local(zone, date.and_time(last_second_of_day()))
}

fn last_second_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}
