//! Due-date orchestration.
//!
//! [`ClosedLibraryStrategyService`] turns a loan and its policy into a final
//! due date in two phases. The I/O phase fetches opening days from the
//! [`CalendarRepository`]; the pure phase builds a [`LibraryTimetable`] and
//! runs the selected [`ClosedLibraryStrategy`]. When the policy declares a
//! due-date limit, the result is then clamped to it.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::json;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::calendar::CalendarRepository;
use crate::error::EngineResult;
use crate::models::{
    AuditStep, DueDateCalculation, Loan, LoanPolicy, OpeningDay, ServicePointId, end_of_day,
    local_date,
};

use super::strategy::{
    ClosedLibraryStrategy, determine_closed_library_strategy,
    determine_strategy_for_moving_backward,
};
use super::timetable::LibraryTimetable;

/// Audit steps collected while a calculation runs.
#[derive(Debug, Default)]
struct AuditTrail {
    steps: Vec<AuditStep>,
}

impl AuditTrail {
    fn record(
        &mut self,
        rule_id: &str,
        rule_name: &str,
        input: serde_json::Value,
        output: serde_json::Value,
        reasoning: String,
    ) {
        let step_number = self.steps.len() as u32 + 1;
        self.steps.push(
            AuditStep::new(step_number, rule_id, rule_name)
                .with_input(input)
                .with_output(output)
                .with_reasoning(reasoning),
        );
    }
}

/// Computes due dates for loans against service point opening hours.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::calculation::ClosedLibraryStrategyService;
/// use loan_due_date_engine::calendar::InMemoryCalendar;
/// use loan_due_date_engine::models::{DueDateManagement, Loan, LoanPolicy, Period, ServicePointId};
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::Europe::London;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let service = ClosedLibraryStrategyService::new(InMemoryCalendar::new(), London);
/// let loan_date = Utc.with_ymd_and_hms(2026, 1, 12, 10, 0, 0).unwrap();
/// let loan = Loan::new("loan-1", loan_date, loan_date, ServicePointId::new_v4());
/// let policy = LoanPolicy::rolling("policy-1", Period::weeks(1), DueDateManagement::KeepCurrentDate);
///
/// let calculation = service.calculate_due_date(&loan, &policy, loan_date).await.unwrap();
/// assert_eq!(calculation.due_date, Utc.with_ymd_and_hms(2026, 1, 19, 23, 59, 59).unwrap());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ClosedLibraryStrategyService<C> {
    calendar: C,
    zone: Tz,
}

impl<C: CalendarRepository> ClosedLibraryStrategyService<C> {
    /// Creates a service resolving local dates in `zone`.
    pub fn new(calendar: C, zone: Tz) -> Self {
        Self { calendar, zone }
    }

    /// The tenant zone.
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// The calendar the service reads from.
    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// Calculates the due date for a checkout or renewal happening at `now`.
    ///
    /// The initial due date comes from the policy: the loan date plus the loan
    /// period for rolling policies (end of the local day unless the period is
    /// in minutes or hours), or the end of the schedule's due date for fixed
    /// policies. Closed-library handling and the due-date limit are applied
    /// after that. Every decision is recorded as an [`AuditStep`].
    ///
    /// # Arguments
    ///
    /// * `loan` - The loan being checked out or renewed
    /// * `policy` - The loan policy to apply
    /// * `now` - The moment of the checkout or renewal
    ///
    /// # Returns
    ///
    /// The due date with its audit trail, or an error when the policy is
    /// misconfigured or the calendar cannot be read.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use chrono_tz::Europe::London;
    /// use loan_due_date_engine::calculation::ClosedLibraryStrategyService;
    /// use loan_due_date_engine::calendar::InMemoryCalendar;
    /// use loan_due_date_engine::models::{DueDateManagement, Loan, LoanPolicy, Period, ServicePointId};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let service = ClosedLibraryStrategyService::new(InMemoryCalendar::new(), London);
    /// let loan_date = Utc.with_ymd_and_hms(2026, 1, 9, 10, 0, 0).unwrap();
    /// let loan = Loan::new("loan", loan_date, loan_date, ServicePointId::new_v4());
    /// let policy = LoanPolicy::rolling("week", Period::weeks(1), DueDateManagement::KeepCurrentDate);
    ///
    /// let result = service.calculate_due_date(&loan, &policy, loan_date).await.unwrap();
    /// assert_eq!(result.due_date, Utc.with_ymd_and_hms(2026, 1, 16, 23, 59, 59).unwrap());
    /// # }
    /// ```
    pub async fn calculate_due_date(
        &self,
        loan: &Loan,
        policy: &LoanPolicy,
        now: DateTime<Utc>,
    ) -> EngineResult<DueDateCalculation> {
        let calculation_id = Uuid::new_v4();
        let span = info_span!(
            "due_date_calculation",
            calculation_id = %calculation_id,
            loan_id = %loan.id,
            policy_id = %policy.id
        );

        async move {
            let mut trail = AuditTrail::default();
            let result = self.calculate_with_trail(loan, policy, now, &mut trail).await;
            match result {
                Ok(due_date) => {
                    info!(due_date = %due_date, steps = trail.steps.len(), "Due date calculated");
                    Ok(DueDateCalculation {
                        calculation_id,
                        loan_id: loan.id.clone(),
                        due_date,
                        audit_steps: trail.steps,
                    })
                }
                Err(err) => {
                    warn!(error = %err, "Due date calculation failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// The due date the policy asks for before closures are considered.
    pub fn initial_due_date(&self, loan: &Loan, policy: &LoanPolicy) -> EngineResult<DateTime<Utc>> {
        let zone = self.zone;
        if policy.is_fixed() {
            let due = policy
                .fixed_schedules()?
                .due_date_for(local_date(zone, loan.loan_date))?;
            return end_of_day(zone, due);
        }

        let period = policy.loan_period()?;
        let due = period
            .plus_date(loan.loan_date.with_timezone(&zone))?
            .with_timezone(&Utc);
        if period.is_short_term() {
            Ok(due)
        } else {
            end_of_day(zone, local_date(zone, due))
        }
    }

    /// Moves `requested` out of closed time according to the policy, then
    /// clamps it to the policy's due-date limit.
    pub async fn apply_closed_library_due_date_management(
        &self,
        loan: &Loan,
        policy: &LoanPolicy,
        requested: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EngineResult<DateTime<Utc>> {
        let mut trail = AuditTrail::default();
        self.manage(loan, policy, requested, now, &mut trail).await
    }

    async fn calculate_with_trail(
        &self,
        loan: &Loan,
        policy: &LoanPolicy,
        now: DateTime<Utc>,
        trail: &mut AuditTrail,
    ) -> EngineResult<DateTime<Utc>> {
        let initial = self.initial_due_date(loan, policy)?;
        let reasoning = match (policy.is_fixed(), policy.period) {
            (false, Some(period)) => format!("Loan date plus {}", period),
            _ => "Due date from the fixed due date schedule".to_string(),
        };
        trail.record(
            "initial_due_date",
            "Initial Due Date",
            json!({ "loan_date": loan.loan_date, "profile": policy.profile }),
            json!({ "due_date": initial }),
            reasoning,
        );
        debug!(initial_due_date = %initial, "Initial due date derived");

        self.manage(loan, policy, initial, now, trail).await
    }

    async fn manage(
        &self,
        loan: &Loan,
        policy: &LoanPolicy,
        requested: DateTime<Utc>,
        now: DateTime<Utc>,
        trail: &mut AuditTrail,
    ) -> EngineResult<DateTime<Utc>> {
        let service_point = loan.checkout_service_point_id;
        let strategy = determine_closed_library_strategy(policy, now, self.zone);
        let candidate = self.run_strategy(strategy, service_point, requested).await?;
        trail.record(
            "closed_library_strategy",
            "Closed Library Strategy",
            json!({
                "requested": requested,
                "due_date_management": policy.due_date_management,
                "strategy": strategy.name(),
            }),
            json!({ "due_date": candidate }),
            format!("Applied {} for {}", strategy.name(), policy.due_date_management),
        );

        if policy.is_fixed() {
            return Ok(candidate);
        }
        let Some(limit_schedules) = policy.due_date_limit_schedules.as_ref() else {
            return Ok(candidate);
        };

        let zone = self.zone;
        let limit_date = limit_schedules.due_date_for(local_date(zone, loan.loan_date))?;
        if local_date(zone, candidate) <= limit_date {
            trail.record(
                "due_date_limit",
                "Due Date Limit",
                json!({ "candidate": candidate, "limit_date": limit_date }),
                json!({ "due_date": candidate }),
                format!("Within limit {}", limit_date),
            );
            return Ok(candidate);
        }

        let limit = end_of_day(zone, limit_date)?;
        let backward = determine_strategy_for_moving_backward(policy, now);
        let moved = self.run_strategy(backward, service_point, limit).await?;
        let clamped = moved.min(limit);
        debug!(candidate = %candidate, limit = %limit, due_date = %clamped, "Due date clamped to limit");
        trail.record(
            "due_date_limit",
            "Due Date Limit",
            json!({
                "candidate": candidate,
                "limit_date": limit_date,
                "strategy": backward.name(),
            }),
            json!({ "due_date": clamped }),
            format!("Exceeded limit {}, moved back with {}", limit_date, backward.name()),
        );
        Ok(clamped)
    }

    async fn run_strategy(
        &self,
        strategy: ClosedLibraryStrategy,
        service_point: ServicePointId,
        requested: DateTime<Utc>,
    ) -> EngineResult<DateTime<Utc>> {
        if !strategy.requires_calendar() {
            return strategy.calculate_due_date(requested, &LibraryTimetable::empty(self.zone));
        }
        let timetable = self.fetch_timetable(strategy, service_point, requested).await?;
        debug!(
            strategy = strategy.name(),
            service_point_id = %service_point,
            intervals = timetable.intervals().len(),
            "Running closed library strategy"
        );
        strategy.calculate_due_date(requested, &timetable)
    }

    /// Fetches the days around `requested` and, for strategies anchored on
    /// "now", the days around now as well.
    async fn fetch_timetable(
        &self,
        strategy: ClosedLibraryStrategy,
        service_point: ServicePointId,
        requested: DateTime<Utc>,
    ) -> EngineResult<LibraryTimetable> {
        let zone = self.zone;
        let requested_date = local_date(zone, requested);
        let mut dates = vec![requested_date];
        if let ClosedLibraryStrategy::EndOfCurrentHours { now } = strategy {
            let today = local_date(zone, now);
            if today != requested_date {
                dates.push(today);
            }
        }

        let mut days: BTreeMap<NaiveDate, OpeningDay> = BTreeMap::new();
        for date in dates {
            let adjacent = self
                .calendar
                .fetch_adjacent_opening_days(service_point, date)
                .await?;
            for day in adjacent.days() {
                match days.get(&day.date) {
                    Some(existing) if existing.is_open() => {}
                    _ => {
                        days.insert(day.date, day.clone());
                    }
                }
            }
        }
        LibraryTimetable::from_opening_days(days.values(), zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::InMemoryCalendar;
    use crate::error::EngineError;
    use crate::models::{
        DueDateManagement, FixedDueDateSchedule, FixedDueDateSchedules, OpeningHour, Period,
    };
    use chrono::{NaiveTime, TimeZone};
    use chrono_tz::Europe::London;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(d: &str, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        let local = date(d).and_hms_opt(h, m, s).unwrap();
        London.from_local_datetime(&local).unwrap().with_timezone(&Utc)
    }

    fn open(d: &str, start: u32, end: (u32, u32)) -> OpeningDay {
        OpeningDay::with_hours(
            date(d),
            London,
            vec![OpeningHour::new(
                NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            )],
        )
    }

    fn service_with(
        service_point: ServicePointId,
        days: Vec<OpeningDay>,
    ) -> ClosedLibraryStrategyService<InMemoryCalendar> {
        ClosedLibraryStrategyService::new(InMemoryCalendar::new().with_days(service_point, days), London)
    }

    fn end_of_march() -> FixedDueDateSchedules {
        FixedDueDateSchedules::new(
            "spring-term",
            vec![FixedDueDateSchedule {
                from: date("2026-03-01"),
                to: date("2026-03-31"),
                due: date("2026-03-31"),
            }],
        )
    }

    #[tokio::test]
    async fn test_friday_due_date_moves_to_end_of_monday() {
        let service_point = ServicePointId::new_v4();
        let service = service_with(
            service_point,
            vec![
                open("2026-01-15", 9, (17, 0)),
                open("2026-01-16", 9, (17, 0)),
                open("2026-01-19", 8, (23, 59)),
            ],
        );
        let loan_date = at("2026-01-09", 10, 0, 0);
        let loan = Loan::new("loan-1", loan_date, loan_date, service_point);
        let policy = LoanPolicy::rolling(
            "one-week",
            Period::weeks(1),
            DueDateManagement::MoveToEndOfNextOpenDay,
        );

        let calculation = service.calculate_due_date(&loan, &policy, loan_date).await.unwrap();

        assert_eq!(calculation.due_date, at("2026-01-19", 23, 59, 59));
        assert_eq!(calculation.loan_id, "loan-1");
        let rule_ids: Vec<_> = calculation.audit_steps.iter().map(|s| s.rule_id.as_str()).collect();
        assert_eq!(rule_ids, vec!["initial_due_date", "closed_library_strategy"]);
        assert_eq!(calculation.audit_steps[0].output["due_date"], json!(at("2026-01-16", 23, 59, 59)));
    }

    #[tokio::test]
    async fn test_oversized_loan_period_is_rejected() {
        let service = ClosedLibraryStrategyService::new(InMemoryCalendar::new(), London);
        let loan_date = at("2026-03-10", 10, 0, 0);
        let loan = Loan::new("loan-huge", loan_date, loan_date, ServicePointId::new_v4());
        let policy = LoanPolicy::rolling(
            "forever",
            Period::days(1_000_000_000_000_000_000),
            DueDateManagement::KeepCurrentDate,
        );

        let result = service.calculate_due_date(&loan, &policy, loan_date).await;

        assert!(matches!(result, Err(EngineError::InvalidDuration { .. })));
    }

    #[tokio::test]
    async fn test_due_date_within_limit_is_unchanged() {
        let service = ClosedLibraryStrategyService::new(InMemoryCalendar::new(), London);
        let loan_date = at("2026-03-10", 10, 0, 0);
        let loan = Loan::new("loan-2", loan_date, loan_date, ServicePointId::new_v4());
        let policy = LoanPolicy::rolling("three-weeks", Period::weeks(3), DueDateManagement::KeepCurrentDate)
            .with_limit(end_of_march());

        let calculation = service.calculate_due_date(&loan, &policy, loan_date).await.unwrap();

        assert_eq!(calculation.due_date, at("2026-03-31", 23, 59, 59));
        assert!(calculation.has_step("due_date_limit"));
    }

    #[tokio::test]
    async fn test_due_date_past_limit_moves_back_to_last_open_hours() {
        let service_point = ServicePointId::new_v4();
        let service = service_with(
            service_point,
            vec![
                open("2026-03-30", 9, (17, 0)),
                open("2026-03-31", 9, (17, 0)),
                open("2026-04-01", 9, (17, 0)),
            ],
        );
        let loan_date = at("2026-03-20", 10, 0, 0);
        let loan = Loan::new("loan-3", loan_date, loan_date, service_point);
        let policy = LoanPolicy::rolling("three-weeks", Period::weeks(3), DueDateManagement::KeepCurrentDate)
            .with_limit(end_of_march());

        let calculation = service.calculate_due_date(&loan, &policy, loan_date).await.unwrap();

        assert_eq!(calculation.due_date, at("2026-03-31", 17, 0, 0));
        assert!(calculation.due_date <= at("2026-03-31", 23, 59, 59));
        let limit_step = calculation.audit_steps.last().unwrap();
        assert_eq!(limit_step.rule_id, "due_date_limit");
        assert_eq!(limit_step.input["strategy"], "move_to_end_of_previous_open_day");
    }

    #[tokio::test]
    async fn test_loan_date_outside_limit_schedule_fails() {
        let service = ClosedLibraryStrategyService::new(InMemoryCalendar::new(), London);
        let loan_date = at("2026-04-02", 10, 0, 0);
        let loan = Loan::new("loan-4", loan_date, loan_date, ServicePointId::new_v4());
        let policy = LoanPolicy::rolling("three-weeks", Period::weeks(3), DueDateManagement::KeepCurrentDate)
            .with_limit(end_of_march());

        let result = service.calculate_due_date(&loan, &policy, loan_date).await;

        assert!(matches!(result, Err(EngineError::LoanDateOutsideSchedule { .. })));
    }

    #[tokio::test]
    async fn test_fixed_policy_keeps_schedule_date() {
        let service = ClosedLibraryStrategyService::new(InMemoryCalendar::new(), London);
        let loan_date = at("2026-01-12", 10, 0, 0);
        let loan = Loan::new("loan-5", loan_date, loan_date, ServicePointId::new_v4());
        let schedules = FixedDueDateSchedules::new(
            "january",
            vec![FixedDueDateSchedule {
                from: date("2026-01-01"),
                to: date("2026-01-31"),
                due: date("2026-02-02"),
            }],
        );
        let policy = LoanPolicy::fixed(
            "fixed",
            schedules,
            DueDateManagement::MoveToBeginningOfNextOpenServicePointHours,
        );

        let calculation = service.calculate_due_date(&loan, &policy, loan_date).await.unwrap();

        assert_eq!(calculation.due_date, at("2026-02-02", 23, 59, 59));
        assert_eq!(calculation.audit_steps[1].input["strategy"], "keep_current_date");
    }

    #[tokio::test]
    async fn test_short_term_loan_ends_with_current_hours() {
        let service_point = ServicePointId::new_v4();
        let service = service_with(
            service_point,
            vec![open("2026-01-15", 9, (17, 0)), open("2026-01-16", 9, (17, 0))],
        );
        let loan_date = at("2026-01-16", 16, 0, 0);
        let loan = Loan::new("loan-6", loan_date, loan_date, service_point);
        let policy = LoanPolicy::rolling(
            "two-hours",
            Period::hours(2),
            DueDateManagement::MoveToEndOfCurrentServicePointHours,
        );

        let calculation = service.calculate_due_date(&loan, &policy, loan_date).await.unwrap();

        assert_eq!(calculation.due_date, at("2026-01-16", 17, 0, 0));
    }

    #[tokio::test]
    async fn test_missing_calendar_is_a_typed_failure() {
        let service = ClosedLibraryStrategyService::new(InMemoryCalendar::new(), London);
        let loan_date = at("2026-01-09", 10, 0, 0);
        let loan = Loan::new("loan-7", loan_date, loan_date, ServicePointId::new_v4());
        let policy = LoanPolicy::rolling(
            "one-week",
            Period::weeks(1),
            DueDateManagement::MoveToEndOfNextOpenDay,
        );

        let result = service.calculate_due_date(&loan, &policy, loan_date).await;

        assert!(matches!(result, Err(EngineError::CalendarUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_rolling_policy_without_period_is_misconfigured() {
        let service = ClosedLibraryStrategyService::new(InMemoryCalendar::new(), London);
        let loan_date = at("2026-01-09", 10, 0, 0);
        let loan = Loan::new("loan-8", loan_date, loan_date, ServicePointId::new_v4());
        let mut policy = LoanPolicy::rolling(
            "broken",
            Period::weeks(1),
            DueDateManagement::KeepCurrentDate,
        );
        policy.period = None;

        let result = service.calculate_due_date(&loan, &policy, loan_date).await;

        assert!(matches!(result, Err(EngineError::PolicyMisconfigured { .. })));
    }

    #[tokio::test]
    async fn test_apply_management_returns_open_date_unchanged() {
        let service_point = ServicePointId::new_v4();
        let service = service_with(
            service_point,
            vec![open("2026-01-15", 9, (17, 0)), open("2026-01-16", 9, (17, 0))],
        );
        let loan_date = at("2026-01-02", 10, 0, 0);
        let loan = Loan::new("loan-9", loan_date, loan_date, service_point);
        let policy = LoanPolicy::rolling(
            "two-weeks",
            Period::weeks(2),
            DueDateManagement::MoveToEndOfPreviousOpenDay,
        );
        let requested = at("2026-01-16", 12, 0, 0);

        let due = service
            .apply_closed_library_due_date_management(&loan, &policy, requested, loan_date)
            .await
            .unwrap();

        assert_eq!(due, requested);
    }
}
