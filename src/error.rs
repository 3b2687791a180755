//! Error types for the loan due-date engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the engine can report. Errors fall into three families:
//! configuration errors (bad periods, misconfigured policies, unreadable
//! settings), data-availability errors (missing or unreachable calendar data)
//! and out-of-range errors (a loan date no fixed schedule covers).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// The main error type for the loan due-date engine.
///
/// Every variant carries enough context (field name, offending value) for a
/// caller to build an API-facing message. None of them are retried inside the
/// engine.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::error::EngineError;
///
/// let error = EngineError::UnrecognizedInterval {
///     field: "loansPolicy.period".to_string(),
///     value: "Fortnights".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Unrecognized interval 'Fortnights' for field 'loansPolicy.period'"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A period named an interval unit the engine does not know.
    #[error("Unrecognized interval '{value}' for field '{field}'")]
    UnrecognizedInterval {
        /// The policy field holding the period.
        field: String,
        /// The offending interval name.
        value: String,
    },

    /// A period duration was missing or not strictly positive.
    #[error("Invalid duration for field '{field}': {message}")]
    InvalidDuration {
        /// The policy field holding the period.
        field: String,
        /// What was wrong with the duration.
        message: String,
    },

    /// A loan policy is missing data its profile requires.
    #[error("Loan policy '{policy_id}' is misconfigured: {message}")]
    PolicyMisconfigured {
        /// The ID of the offending policy.
        policy_id: String,
        /// A description of the missing or inconsistent data.
        message: String,
    },

    /// The timetable holds no interval for the instant being resolved.
    #[error("Calendar open periods are not found for {instant}")]
    CalendarOpenPeriodsNotFound {
        /// The instant that could not be placed on the timetable.
        instant: DateTime<Utc>,
    },

    /// The calendar provider could not supply opening days.
    #[error("Calendar unavailable for service point '{service_point_id}': {message}")]
    CalendarUnavailable {
        /// The service point whose calendar was requested.
        service_point_id: String,
        /// A description of the failure.
        message: String,
    },

    /// A local date-time does not exist in the given zone.
    #[error("Local time {local} cannot be resolved in zone {zone}")]
    InvalidLocalTime {
        /// The local date-time.
        local: NaiveDateTime,
        /// The IANA name of the zone.
        zone: String,
    },

    /// The loan date falls outside every range of a fixed due-date schedule.
    #[error("Loan date {loan_date} is not covered by fixed due date schedule '{schedule_id}'")]
    LoanDateOutsideSchedule {
        /// The ID of the schedule that was searched.
        schedule_id: String,
        /// The loan date that no range covers.
        loan_date: NaiveDate,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
