//! Loan periods: a duration paired with an interval unit.
//!
//! A [`Period`] is read from policy data (`{"duration": 3, "intervalId":
//! "Weeks"}`) and used in two very different ways:
//!
//! - calendar arithmetic ([`Period::plus_date`], [`Period::minus_date`]),
//!   which adds real calendar units in the local zone, and
//! - duration comparison ([`Period::to_minutes`]), which uses a fixed table
//!   where a month is 31 days and a week is 7 days.
//!
//! The table is an approximation. It is only ever used to compare periods
//! (grace periods against overdue minutes) and existing policy outcomes
//! depend on it, so it must stay as it is.

use std::fmt;

use chrono::{DateTime, Months, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::zoned::resolve_local;

/// Minutes in an hour.
pub const MINUTES_PER_HOUR: i64 = 60;
/// Minutes in a day.
pub const MINUTES_PER_DAY: i64 = 1_440;
/// Minutes in a week.
pub const MINUTES_PER_WEEK: i64 = 10_080;
/// Minutes in a month, taken as 31 days.
pub const MINUTES_PER_MONTH: i64 = 44_640;

/// The unit of a [`Period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Calendar days.
    Days,
    /// Calendar weeks.
    Weeks,
    /// Calendar months.
    Months,
}

impl Interval {
    /// All interval units, shortest first.
    pub const ALL: [Interval; 5] = [
        Interval::Minutes,
        Interval::Hours,
        Interval::Days,
        Interval::Weeks,
        Interval::Months,
    ];

    /// Parses an interval name as it appears in policy data.
    ///
    /// `field` names the policy field and is reported back on failure.
    pub fn parse(field: &str, value: &str) -> EngineResult<Self> {
        match value {
            "Minutes" => Ok(Interval::Minutes),
            "Hours" => Ok(Interval::Hours),
            "Days" => Ok(Interval::Days),
            "Weeks" => Ok(Interval::Weeks),
            "Months" => Ok(Interval::Months),
            other => Err(EngineError::UnrecognizedInterval {
                field: field.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// The approximate number of minutes in one unit.
    pub fn minutes(self) -> i64 {
        match self {
            Interval::Minutes => 1,
            Interval::Hours => MINUTES_PER_HOUR,
            Interval::Days => MINUTES_PER_DAY,
            Interval::Weeks => MINUTES_PER_WEEK,
            Interval::Months => MINUTES_PER_MONTH,
        }
    }

    /// The name used in policy data.
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Minutes => "Minutes",
            Interval::Hours => "Hours",
            Interval::Days => "Days",
            Interval::Weeks => "Weeks",
            Interval::Months => "Months",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loan-policy period such as "3 Weeks" or "2 Hours".
///
/// A zero duration is the "no period" sentinel; [`Period::from_parts`] never
/// produces one, it only comes from [`Period::ZERO`].
///
/// # Example
///
/// ```
/// use loan_due_date_engine::models::{Interval, Period};
///
/// let period = Period::from_parts("loanPeriod", Some(3), Some("Weeks")).unwrap();
/// assert_eq!(period.interval(), Interval::Weeks);
/// assert_eq!(period.to_minutes(), 30_240);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod", into = "RawPeriod")]
pub struct Period {
    duration: i64,
    interval: Interval,
}

/// Wire shape of a period in policy documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPeriod {
    duration: Option<i64>,
    interval_id: Option<String>,
}

impl TryFrom<RawPeriod> for Period {
    type Error = EngineError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Period::from_parts("period", raw.duration, raw.interval_id.as_deref())
    }
}

impl From<Period> for RawPeriod {
    fn from(period: Period) -> Self {
        RawPeriod {
            duration: Some(period.duration),
            interval_id: Some(period.interval.as_str().to_string()),
        }
    }
}

impl Period {
    /// The "no period" sentinel.
    pub const ZERO: Period = Period {
        duration: 0,
        interval: Interval::Minutes,
    };

    /// Builds a period from already-validated parts.
    pub const fn new(duration: i64, interval: Interval) -> Self {
        Self { duration, interval }
    }

    /// A period of `n` minutes.
    pub const fn minutes(n: i64) -> Self {
        Self::new(n, Interval::Minutes)
    }

    /// A period of `n` hours.
    pub const fn hours(n: i64) -> Self {
        Self::new(n, Interval::Hours)
    }

    /// A period of `n` days.
    pub const fn days(n: i64) -> Self {
        Self::new(n, Interval::Days)
    }

    /// A period of `n` weeks.
    pub const fn weeks(n: i64) -> Self {
        Self::new(n, Interval::Weeks)
    }

    /// A period of `n` months.
    pub const fn months(n: i64) -> Self {
        Self::new(n, Interval::Months)
    }

    /// Parses a period from the optional parts found in policy data.
    ///
    /// Fails with [`EngineError::InvalidDuration`] when the duration is
    /// missing or not strictly positive, and with
    /// [`EngineError::UnrecognizedInterval`] when the interval is missing or
    /// unknown.
    pub fn from_parts(
        field: &str,
        duration: Option<i64>,
        interval: Option<&str>,
    ) -> EngineResult<Self> {
        let interval = match interval {
            Some(name) => Interval::parse(field, name)?,
            None => {
                return Err(EngineError::UnrecognizedInterval {
                    field: field.to_string(),
                    value: "<missing>".to_string(),
                });
            }
        };

        match duration {
            None => Err(EngineError::InvalidDuration {
                field: field.to_string(),
                message: "duration is missing".to_string(),
            }),
            Some(d) if d <= 0 => Err(EngineError::InvalidDuration {
                field: field.to_string(),
                message: format!("duration must be positive, got {}", d),
            }),
            Some(d) => Ok(Self::new(d, interval)),
        }
    }

    /// The number of units.
    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// The unit.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Whether this is the "no period" sentinel.
    pub fn is_zero(&self) -> bool {
        self.duration == 0
    }

    /// Whether the period is measured in minutes or hours.
    ///
    /// Short-term loans are due at an exact time; long-term loans are due at
    /// the end of a day.
    pub fn is_short_term(&self) -> bool {
        matches!(self.interval, Interval::Minutes | Interval::Hours)
    }

    /// The approximate length of the period in minutes, for comparisons only.
    ///
    /// Saturates at the `i64` bounds instead of overflowing.
    pub fn to_minutes(&self) -> i64 {
        self.duration.saturating_mul(self.interval.minutes())
    }

    /// Adds the period to `date_time` using calendar arithmetic.
    ///
    /// Minutes and hours are elapsed time. Days, weeks and months move the
    /// local calendar date and keep the wall-clock time. A duration too large
    /// for date arithmetic is an [`EngineError::InvalidDuration`].
    pub fn plus_date(&self, date_time: DateTime<Tz>) -> EngineResult<DateTime<Tz>> {
        self.shift(date_time, self.duration)
    }

    /// Subtracts the period from `date_time` using calendar arithmetic.
    pub fn minus_date(&self, date_time: DateTime<Tz>) -> EngineResult<DateTime<Tz>> {
        let amount = self.duration.checked_neg().ok_or_else(|| self.out_of_range())?;
        self.shift(date_time, amount)
    }

    /// Whether `start` plus this period is at or before `now`.
    pub fn has_passed_since_date_till_now(
        &self,
        start: DateTime<Tz>,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        Ok(self.plus_date(start)? <= now)
    }

    /// Whether `start` plus this period is still after `now`.
    pub fn has_not_passed_since_date_till_now(
        &self,
        start: DateTime<Tz>,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        Ok(!self.has_passed_since_date_till_now(start, now)?)
    }

    fn shift(&self, date_time: DateTime<Tz>, amount: i64) -> EngineResult<DateTime<Tz>> {
        let zone = date_time.timezone();
        let local = date_time.naive_local();
        match self.interval {
            Interval::Minutes | Interval::Hours => {
                let delta = match self.interval {
                    Interval::Minutes => TimeDelta::try_minutes(amount),
                    _ => TimeDelta::try_hours(amount),
                }
                .ok_or_else(|| self.out_of_range())?;
                date_time
                    .checked_add_signed(delta)
                    .ok_or_else(|| self.out_of_range())
            }
            Interval::Days | Interval::Weeks => {
                let delta = match self.interval {
                    Interval::Days => TimeDelta::try_days(amount),
                    _ => TimeDelta::try_weeks(amount),
                }
                .ok_or_else(|| self.out_of_range())?;
                let shifted = local
                    .checked_add_signed(delta)
                    .ok_or_else(|| self.out_of_range())?;
                Ok(resolve_local(zone, shifted)?.with_timezone(&zone))
            }
            Interval::Months => {
                let months = u32::try_from(amount.unsigned_abs())
                    .map(Months::new)
                    .map_err(|_| self.out_of_range())?;
                let shifted = if amount >= 0 {
                    local.checked_add_months(months)
                } else {
                    local.checked_sub_months(months)
                };
                let shifted = shifted.ok_or_else(|| self.out_of_range())?;
                Ok(resolve_local(zone, shifted)?.with_timezone(&zone))
            }
        }
    }

    fn out_of_range(&self) -> EngineError {
        EngineError::InvalidDuration {
            field: "period".to_string(),
            message: format!("{} is out of range for date arithmetic", self),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.duration, self.interval)
    }
}
