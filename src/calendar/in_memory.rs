//! In-memory calendar provider.
//!
//! Holds opening days per service point in a `BTreeMap` keyed by date, which
//! makes "nearest open day before/after" a range scan. Dates with no record
//! are treated as closed.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::models::{AdjacentOpeningDays, OpeningDay, ServicePointId, local_date};

use super::repository::CalendarRepository;

#[derive(Debug, Clone)]
struct ServicePointCalendar {
    zone: Tz,
    days: BTreeMap<NaiveDate, OpeningDay>,
}

/// A [`CalendarRepository`] backed by memory.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::calendar::InMemoryCalendar;
/// use loan_due_date_engine::models::{OpeningDay, ServicePointId};
/// use chrono::NaiveDate;
/// use chrono_tz::Europe::London;
///
/// let service_point = ServicePointId::new_v4();
/// let mut calendar = InMemoryCalendar::new();
/// calendar.add_day(
///     service_point,
///     OpeningDay::all_day(NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(), London),
/// );
/// assert_eq!(calendar.day_count(service_point), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCalendar {
    service_points: HashMap<ServicePointId, ServicePointCalendar>,
}

impl InMemoryCalendar {
    /// An empty calendar that knows no service points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an opening day, replacing any record for the same date.
    ///
    /// The first day recorded for a service point fixes its zone.
    pub fn add_day(&mut self, service_point_id: ServicePointId, day: OpeningDay) {
        let calendar = self
            .service_points
            .entry(service_point_id)
            .or_insert_with(|| ServicePointCalendar {
                zone: day.zone,
                days: BTreeMap::new(),
            });
        calendar.days.insert(day.date, day);
    }

    /// Records several opening days.
    pub fn with_days(
        mut self,
        service_point_id: ServicePointId,
        days: impl IntoIterator<Item = OpeningDay>,
    ) -> Self {
        for day in days {
            self.add_day(service_point_id, day);
        }
        self
    }

    /// Number of days recorded for a service point.
    pub fn day_count(&self, service_point_id: ServicePointId) -> usize {
        self.service_points
            .get(&service_point_id)
            .map_or(0, |c| c.days.len())
    }

    fn calendar_for(&self, service_point_id: ServicePointId) -> EngineResult<&ServicePointCalendar> {
        self.service_points.get(&service_point_id).ok_or_else(|| {
            warn!(service_point_id = %service_point_id, "No calendar for service point");
            EngineError::CalendarUnavailable {
                service_point_id: service_point_id.to_string(),
                message: "no calendar data for service point".to_string(),
            }
        })
    }
}

impl ServicePointCalendar {
    fn day(&self, date: NaiveDate) -> OpeningDay {
        self.days
            .get(&date)
            .cloned()
            .unwrap_or_else(|| OpeningDay::closed(date, self.zone))
    }

    fn nearest_open_before(&self, date: NaiveDate) -> OpeningDay {
        self.days
            .range(..date)
            .rev()
            .map(|(_, day)| day)
            .find(|day| day.is_open())
            .cloned()
            .unwrap_or_else(|| OpeningDay::closed(date.pred_opt().unwrap_or(date), self.zone))
    }

    fn nearest_open_after(&self, date: NaiveDate) -> OpeningDay {
        let following = date.succ_opt().unwrap_or(date);
        self.days
            .range(following..)
            .map(|(_, day)| day)
            .find(|day| day.is_open())
            .cloned()
            .unwrap_or_else(|| OpeningDay::closed(following, self.zone))
    }
}

#[async_trait]
impl CalendarRepository for InMemoryCalendar {
    async fn fetch_adjacent_opening_days(
        &self,
        service_point_id: ServicePointId,
        date: NaiveDate,
    ) -> EngineResult<AdjacentOpeningDays> {
        let calendar = self.calendar_for(service_point_id)?;
        Ok(AdjacentOpeningDays::new(
            calendar.nearest_open_before(date),
            calendar.day(date),
            calendar.nearest_open_after(date),
        ))
    }

    async fn fetch_opening_days_between(
        &self,
        service_point_id: ServicePointId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        include_closed: bool,
    ) -> EngineResult<Vec<OpeningDay>> {
        let calendar = self.calendar_for(service_point_id)?;
        let first = local_date(calendar.zone, from);
        let last = local_date(calendar.zone, to);
        if first > last {
            return Ok(Vec::new());
        }

        Ok(first
            .iter_days()
            .take_while(|date| *date <= last)
            .map(|date| calendar.day(date))
            .filter(|day| include_closed || day.is_open())
            .collect())
    }
}
