//! Overdue minutes for fine calculation.
//!
//! Overdue time is either the raw elapsed time since the due date or, when the
//! overdue-fine policy excludes closed periods, only the time the item's
//! service point was open. A grace period then forgives short overdues.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::calculation::timetable::merge_touching;
use crate::calendar::CalendarRepository;
use crate::error::EngineResult;
use crate::models::{Loan, OpeningDay, OverdueFinePolicy};

/// Computes how many minutes a loan is overdue.
#[derive(Debug, Clone)]
pub struct OverduePeriodCalculator<C> {
    calendar: C,
}

impl<C: CalendarRepository> OverduePeriodCalculator<C> {
    /// Creates a calculator reading opening hours from `calendar`.
    pub fn new(calendar: C) -> Self {
        Self { calendar }
    }

    /// Overdue minutes of `loan` at `now` under `policy`.
    ///
    /// Zero when the policy does not say whether closed periods count, or
    /// when the loan is not overdue. Calendar failures propagate.
    pub async fn get_minutes(
        &self,
        loan: &Loan,
        policy: &OverdueFinePolicy,
        now: DateTime<Utc>,
    ) -> EngineResult<i64> {
        let Some(count_closed_periods) = policy.count_closed_periods else {
            debug!(loan_id = %loan.id, "Policy does not say whether closed periods count");
            return Ok(0);
        };
        if !loan.is_overdue(now) {
            return Ok(0);
        }

        let minutes = match loan.item_primary_service_point_id {
            Some(service_point) if !count_closed_periods => {
                // Hours opened the day before can still run past the due date.
                let from = loan
                    .due_date
                    .checked_sub_signed(TimeDelta::days(1))
                    .unwrap_or(loan.due_date);
                let days = self
                    .calendar
                    .fetch_opening_days_between(service_point, from, now, false)
                    .await?;
                open_minutes_between(&days, loan.due_date, now)?
            }
            _ => raw_minutes_between(loan.due_date, now),
        };

        let adjusted = adjust_for_grace_period(loan, policy, minutes);
        debug!(
            loan_id = %loan.id,
            overdue_minutes = minutes,
            adjusted_minutes = adjusted,
            "Overdue minutes calculated"
        );
        Ok(adjusted)
    }
}

/// Whole minutes from `from` to `to`.
pub fn raw_minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}

/// Whole minutes of `[from, to]` during which any of `days` is open.
///
/// Open spans from all days are merged first, so hours that run past midnight
/// into the next day's hours are only counted once.
///
/// # Arguments
///
/// * `days` - Opening days covering the range, in any order
/// * `from` - Start of the range, usually the due date
/// * `to` - End of the range, usually now
///
/// # Returns
///
/// The open minutes inside the range, or an error when a day's hours cannot be
/// resolved in its zone.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
/// use chrono_tz::Tz;
/// use loan_due_date_engine::calculation::open_minutes_between;
/// use loan_due_date_engine::models::{OpeningDay, OpeningHour};
///
/// let day = OpeningDay::with_hours(
///     NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
///     Tz::UTC,
///     vec![OpeningHour::new(
///         NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
///         NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
///     )],
/// );
/// let from = Utc.with_ymd_and_hms(2026, 1, 15, 16, 0, 0).unwrap();
/// let to = Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap();
/// assert_eq!(open_minutes_between(&[day], from, to).unwrap(), 60);
/// ```
pub fn open_minutes_between(
    days: &[OpeningDay],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> EngineResult<i64> {
    let mut spans = Vec::new();
    for day in days {
        spans.extend(day.open_intervals()?);
    }
    let total = merge_touching(spans)
        .into_iter()
        .map(|(start, end)| (start.max(from), end.min(to)))
        .filter(|(start, end)| end > start)
        .fold(TimeDelta::zero(), |total, (start, end)| total + (end - start));
    Ok(total.num_minutes())
}

/// Applies the grace period to `minutes`.
///
/// A recalled loan whose policy explicitly ignores grace for recalls keeps its
/// minutes. Otherwise anything under the grace period is forgiven.
///
/// # Arguments
///
/// * `loan` - The overdue loan, checked for a recall-driven due date
/// * `policy` - The overdue-fine policy holding the grace period
/// * `minutes` - Overdue minutes before grace is applied
///
/// # Returns
///
/// `minutes`, or zero when they fall inside the grace period.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use loan_due_date_engine::calculation::adjust_for_grace_period;
/// use loan_due_date_engine::models::{Loan, OverdueFinePolicy, Period, ServicePointId};
///
/// let loan = Loan::new("loan", Utc::now(), Utc::now(), ServicePointId::new_v4());
/// let policy = OverdueFinePolicy {
///     grace_period: Some(Period::hours(1)),
///     ..Default::default()
/// };
/// assert_eq!(adjust_for_grace_period(&loan, &policy, 45), 0);
/// assert_eq!(adjust_for_grace_period(&loan, &policy, 90), 90);
/// ```
pub fn adjust_for_grace_period(loan: &Loan, policy: &OverdueFinePolicy, minutes: i64) -> i64 {
    if loan.due_date_changed_by_recall && policy.ignore_grace_period_for_recalls == Some(true) {
        return minutes;
    }
    if minutes < policy.grace_period_minutes() {
        0
    } else {
        minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::InMemoryCalendar;
    use crate::error::EngineError;
    use crate::models::{OpeningHour, Period, ServicePointId};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use chrono_tz::Europe::London;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(d: &str, h: u32, m: u32) -> DateTime<Utc> {
        let local = date(d).and_hms_opt(h, m, 0).unwrap();
        London.from_local_datetime(&local).unwrap().with_timezone(&Utc)
    }

    fn nine_to_five(d: &str) -> OpeningDay {
        OpeningDay::with_hours(
            date(d),
            London,
            vec![OpeningHour::new(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            )],
        )
    }

    fn calculator(service_point: ServicePointId) -> OverduePeriodCalculator<InMemoryCalendar> {
        OverduePeriodCalculator::new(InMemoryCalendar::new().with_days(
            service_point,
            vec![
                nine_to_five("2026-01-15"),
                nine_to_five("2026-01-16"),
                OpeningDay::closed(date("2026-01-17"), London),
                nine_to_five("2026-01-18"),
            ],
        ))
    }

    fn policy(count_closed_periods: Option<bool>) -> OverdueFinePolicy {
        OverdueFinePolicy {
            id: "overdue".to_string(),
            count_closed_periods,
            ..Default::default()
        }
    }

    fn overdue_loan(service_point: ServicePointId, due: DateTime<Utc>) -> Loan {
        Loan::new("loan-1", at("2026-01-02", 10, 0), due, service_point)
    }

    #[tokio::test]
    async fn test_unset_count_closed_periods_is_zero() {
        let service_point = ServicePointId::new_v4();
        let loan = overdue_loan(service_point, at("2026-01-16", 12, 0));
        let minutes = calculator(service_point)
            .get_minutes(&loan, &policy(None), at("2026-01-18", 12, 0))
            .await
            .unwrap();
        assert_eq!(minutes, 0);
    }

    #[tokio::test]
    async fn test_loan_not_yet_overdue_is_zero() {
        let service_point = ServicePointId::new_v4();
        let loan = overdue_loan(service_point, at("2026-01-16", 12, 0));
        let minutes = calculator(service_point)
            .get_minutes(&loan, &policy(Some(true)), at("2026-01-16", 11, 0))
            .await
            .unwrap();
        assert_eq!(minutes, 0);
    }

    #[tokio::test]
    async fn test_counting_closed_periods_uses_raw_minutes() {
        let service_point = ServicePointId::new_v4();
        let loan = overdue_loan(service_point, at("2026-01-16", 12, 0));
        let minutes = calculator(service_point)
            .get_minutes(&loan, &policy(Some(true)), at("2026-01-18", 12, 0))
            .await
            .unwrap();
        assert_eq!(minutes, 2 * 24 * 60);
    }

    #[tokio::test]
    async fn test_closed_day_is_excluded() {
        let service_point = ServicePointId::new_v4();
        let loan = overdue_loan(service_point, at("2026-01-16", 12, 0));
        let now = at("2026-01-18", 12, 0);
        let minutes = calculator(service_point)
            .get_minutes(&loan, &policy(Some(false)), now)
            .await
            .unwrap();

        // Friday 12:00-17:00 plus Sunday 09:00-12:00.
        assert_eq!(minutes, 5 * 60 + 3 * 60);
        assert!(minutes < raw_minutes_between(loan.due_date, now));
    }

    #[tokio::test]
    async fn test_item_without_primary_service_point_uses_raw_minutes() {
        let service_point = ServicePointId::new_v4();
        let mut loan = overdue_loan(service_point, at("2026-01-16", 12, 0));
        loan.item_primary_service_point_id = None;
        let minutes = calculator(service_point)
            .get_minutes(&loan, &policy(Some(false)), at("2026-01-16", 14, 30))
            .await
            .unwrap();
        assert_eq!(minutes, 150);
    }

    #[tokio::test]
    async fn test_missing_calendar_propagates() {
        let loan = overdue_loan(ServicePointId::new_v4(), at("2026-01-16", 12, 0));
        let result = calculator(ServicePointId::new_v4())
            .get_minutes(&loan, &policy(Some(false)), at("2026-01-18", 12, 0))
            .await;
        assert!(matches!(result, Err(EngineError::CalendarUnavailable { .. })));
    }

    #[test]
    fn test_grace_period_threshold() {
        let loan = overdue_loan(ServicePointId::new_v4(), at("2026-01-16", 12, 0));
        let policy = OverdueFinePolicy {
            grace_period: Some(Period::hours(1)),
            ..policy(Some(true))
        };
        assert_eq!(adjust_for_grace_period(&loan, &policy, 59), 0);
        assert_eq!(adjust_for_grace_period(&loan, &policy, 60), 60);
        assert_eq!(adjust_for_grace_period(&loan, &policy, 61), 61);
    }

    #[test]
    fn test_recall_grace_handling() {
        let mut loan = overdue_loan(ServicePointId::new_v4(), at("2026-01-16", 12, 0));
        loan.due_date_changed_by_recall = true;
        let honoured = OverdueFinePolicy {
            grace_period: Some(Period::hours(1)),
            ..policy(Some(true))
        };
        let ignored = OverdueFinePolicy {
            ignore_grace_period_for_recalls: Some(true),
            ..honoured.clone()
        };

        assert_eq!(adjust_for_grace_period(&loan, &honoured, 30), 0);
        assert_eq!(adjust_for_grace_period(&loan, &ignored, 30), 30);
    }

    #[tokio::test]
    async fn test_hours_carried_over_from_the_day_before_count() {
        let service_point = ServicePointId::new_v4();
        let calculator = OverduePeriodCalculator::new(InMemoryCalendar::new().with_days(
            service_point,
            vec![
                OpeningDay::with_hours(
                    date("2026-01-16"),
                    London,
                    vec![OpeningHour::new(
                        NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                        NaiveTime::from_hms_opt(4, 0, 0).unwrap(),
                    )],
                ),
                OpeningDay::closed(date("2026-01-17"), London),
            ],
        ));
        let loan = overdue_loan(service_point, at("2026-01-17", 1, 0));
        let minutes = calculator
            .get_minutes(&loan, &policy(Some(false)), at("2026-01-17", 3, 0))
            .await
            .unwrap();
        assert_eq!(minutes, 120);
    }

    #[test]
    fn test_overlapping_hours_are_counted_once() {
        let window = |d: &str, start: u32, end: u32| {
            OpeningDay::with_hours(
                date(d),
                London,
                vec![OpeningHour::new(
                    NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
                )],
            )
        };
        let days = vec![window("2026-01-16", 20, 2), window("2026-01-17", 0, 3)];
        let minutes =
            open_minutes_between(&days, at("2026-01-17", 0, 0), at("2026-01-17", 3, 0)).unwrap();
        assert_eq!(minutes, 180);
    }

    #[test]
    fn test_open_minutes_clip_to_range() {
        let days = vec![nine_to_five("2026-01-15"), nine_to_five("2026-01-16")];
        let minutes =
            open_minutes_between(&days, at("2026-01-15", 16, 0), at("2026-01-16", 10, 15)).unwrap();
        assert_eq!(minutes, 60 + 75);
    }
}
