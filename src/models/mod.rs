//! Core data models for the loan due-date engine.
//!
//! This module contains the domain values the calculations work on: periods,
//! opening-hours records, policies, loans and the audited calculation result.

mod calculation_result;
mod loan;
mod opening_day;
mod period;
mod policy;
mod zoned;

pub use calculation_result::{AuditStep, DueDateCalculation};
pub use loan::{Loan, ServicePointId};
pub use opening_day::{AdjacentOpeningDays, OpeningDay, OpeningHour};
pub use period::{
    Interval, MINUTES_PER_DAY, MINUTES_PER_HOUR, MINUTES_PER_MONTH, MINUTES_PER_WEEK, Period,
};
pub use policy::{
    DueDateManagement, FixedDueDateSchedule, FixedDueDateSchedules, LoanPolicy, LoanProfile,
    OverdueFinePolicy,
};
pub use zoned::{end_of_day, local_date, local_date_time, resolve_local, start_of_day};
