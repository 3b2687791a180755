//! Loan and overdue-fine policy value objects.
//!
//! Policies arrive already parsed from the policy store. This module only
//! models them and answers the questions the calculations ask of them.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::period::Period;

/// How a loan policy derives its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanProfile {
    /// Due date is the loan date plus the policy period.
    Rolling,
    /// Due date comes from a fixed due-date schedule.
    Fixed,
}

/// What to do with a due date that lands while the service point is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueDateManagement {
    /// Keep the date, due at the end of that day.
    KeepCurrentDate,
    /// Keep the exact date and time.
    KeepCurrentDateTime,
    /// Move back to the end of the previous open day.
    MoveToEndOfPreviousOpenDay,
    /// Move forward to the end of the next open day.
    MoveToEndOfNextOpenDay,
    /// Move forward to when the service point next opens.
    MoveToBeginningOfNextOpenServicePointHours,
    /// Move to the end of the service point hours current at checkout.
    MoveToEndOfCurrentServicePointHours,
}

impl fmt::Display for DueDateManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DueDateManagement::KeepCurrentDate => "keep_current_date",
            DueDateManagement::KeepCurrentDateTime => "keep_current_date_time",
            DueDateManagement::MoveToEndOfPreviousOpenDay => "move_to_end_of_previous_open_day",
            DueDateManagement::MoveToEndOfNextOpenDay => "move_to_end_of_next_open_day",
            DueDateManagement::MoveToBeginningOfNextOpenServicePointHours => {
                "move_to_beginning_of_next_open_service_point_hours"
            }
            DueDateManagement::MoveToEndOfCurrentServicePointHours => {
                "move_to_end_of_current_service_point_hours"
            }
        };
        f.write_str(name)
    }
}

/// One range of a fixed due-date schedule.
///
/// Loans made between `from` and `to` (inclusive) are due on `due`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedDueDateSchedule {
    /// First loan date covered.
    pub from: NaiveDate,
    /// Last loan date covered.
    pub to: NaiveDate,
    /// Due date for loans in the range.
    pub due: NaiveDate,
}

impl FixedDueDateSchedule {
    /// Whether `loan_date` falls in this range.
    pub fn covers(&self, loan_date: NaiveDate) -> bool {
        self.from <= loan_date && loan_date <= self.to
    }
}

/// A named set of fixed due-date ranges.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::models::{FixedDueDateSchedule, FixedDueDateSchedules};
/// use chrono::NaiveDate;
///
/// let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
/// let schedules = FixedDueDateSchedules::new(
///     "spring",
///     vec![FixedDueDateSchedule { from: d("2026-01-01"), to: d("2026-03-31"), due: d("2026-03-31") }],
/// );
/// assert_eq!(schedules.due_date_for(d("2026-02-11")).unwrap(), d("2026-03-31"));
/// assert!(schedules.due_date_for(d("2026-04-01")).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedDueDateSchedules {
    /// Schedule identifier.
    pub id: String,
    /// Ranges, in any order.
    pub schedules: Vec<FixedDueDateSchedule>,
}

impl FixedDueDateSchedules {
    /// Creates a schedule set.
    pub fn new(id: impl Into<String>, schedules: Vec<FixedDueDateSchedule>) -> Self {
        Self {
            id: id.into(),
            schedules,
        }
    }

    /// The due date for a loan made on `loan_date`.
    ///
    /// The first range covering the date wins. Fails with
    /// [`EngineError::LoanDateOutsideSchedule`] when none does.
    pub fn due_date_for(&self, loan_date: NaiveDate) -> EngineResult<NaiveDate> {
        self.schedules
            .iter()
            .find(|s| s.covers(loan_date))
            .map(|s| s.due)
            .ok_or_else(|| EngineError::LoanDateOutsideSchedule {
                schedule_id: self.id.clone(),
                loan_date,
            })
    }
}

/// The loan policy governing a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPolicy {
    /// Policy identifier.
    pub id: String,
    /// Human-readable policy name.
    pub name: String,
    /// Rolling or fixed.
    pub profile: LoanProfile,
    /// Loan period, required for rolling policies.
    #[serde(default)]
    pub period: Option<Period>,
    /// Closed-library handling.
    pub due_date_management: DueDateManagement,
    /// Schedule defining due dates, required for fixed policies.
    #[serde(default)]
    pub fixed_due_date_schedules: Option<FixedDueDateSchedules>,
    /// Outer bound on due dates, used by rolling policies.
    #[serde(default)]
    pub due_date_limit_schedules: Option<FixedDueDateSchedules>,
    /// Offset added when moving to the beginning of the next open hours.
    #[serde(default)]
    pub opening_time_offset: Option<Period>,
}

impl LoanPolicy {
    /// A rolling policy with the given period and closed-library handling.
    pub fn rolling(id: impl Into<String>, period: Period, management: DueDateManagement) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            profile: LoanProfile::Rolling,
            period: Some(period),
            due_date_management: management,
            fixed_due_date_schedules: None,
            due_date_limit_schedules: None,
            opening_time_offset: None,
        }
    }

    /// A fixed policy due on the dates of `schedules`.
    pub fn fixed(
        id: impl Into<String>,
        schedules: FixedDueDateSchedules,
        management: DueDateManagement,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            profile: LoanProfile::Fixed,
            period: None,
            due_date_management: management,
            fixed_due_date_schedules: Some(schedules),
            due_date_limit_schedules: None,
            opening_time_offset: None,
        }
    }

    /// Sets the due-date limit schedule.
    pub fn with_limit(mut self, schedules: FixedDueDateSchedules) -> Self {
        self.due_date_limit_schedules = Some(schedules);
        self
    }

    /// Sets the opening-time offset.
    pub fn with_opening_time_offset(mut self, offset: Period) -> Self {
        self.opening_time_offset = Some(offset);
        self
    }

    /// Whether the policy derives due dates from a fixed schedule.
    pub fn is_fixed(&self) -> bool {
        self.profile == LoanProfile::Fixed
    }

    /// The loan period, failing when a rolling policy has none.
    pub fn loan_period(&self) -> EngineResult<Period> {
        match self.period {
            Some(period) if !period.is_zero() => Ok(period),
            _ => Err(EngineError::PolicyMisconfigured {
                policy_id: self.id.clone(),
                message: "rolling profile requires a loan period".to_string(),
            }),
        }
    }

    /// The fixed schedule, failing when a fixed policy has none.
    pub fn fixed_schedules(&self) -> EngineResult<&FixedDueDateSchedules> {
        self.fixed_due_date_schedules
            .as_ref()
            .ok_or_else(|| EngineError::PolicyMisconfigured {
                policy_id: self.id.clone(),
                message: "fixed profile requires a fixed due date schedule".to_string(),
            })
    }

    /// Whether due dates are resolved at the exact time rather than end of day.
    pub fn is_short_term(&self) -> bool {
        !self.is_fixed() && self.period.is_some_and(|p| p.is_short_term())
    }
}

/// The overdue-fine policy governing a loan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverdueFinePolicy {
    /// Policy identifier.
    pub id: String,
    /// Whether time the service point is closed counts as overdue.
    ///
    /// `None` means the policy does not say, and nothing is counted.
    #[serde(default)]
    pub count_closed_periods: Option<bool>,
    /// Whether a recalled loan loses its grace period.
    #[serde(default)]
    pub ignore_grace_period_for_recalls: Option<bool>,
    /// Overdue time that is forgiven.
    #[serde(default)]
    pub grace_period: Option<Period>,
}

impl OverdueFinePolicy {
    /// Grace period length in minutes, zero when there is none.
    pub fn grace_period_minutes(&self) -> i64 {
        self.grace_period.map(|p| p.to_minutes()).unwrap_or(0)
    }
}
