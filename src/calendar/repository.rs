//! The calendar provider port.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::EngineResult;
use crate::models::{AdjacentOpeningDays, OpeningDay, ServicePointId};

/// Source of opening-hours data for service points.
///
/// Implementations fetch from wherever the calendar lives. When a service
/// point has no calendar data they must fail with
/// [`EngineError::CalendarUnavailable`](crate::error::EngineError::CalendarUnavailable)
/// instead of returning an empty result, so that "no closures" and "no data"
/// stay distinguishable.
#[async_trait]
pub trait CalendarRepository: Send + Sync {
    /// The requested date with the nearest open days on either side.
    async fn fetch_adjacent_opening_days(
        &self,
        service_point_id: ServicePointId,
        date: NaiveDate,
    ) -> EngineResult<AdjacentOpeningDays>;

    /// Opening days whose dates fall between `from` and `to` (inclusive, in
    /// the service point's zone), in date order. Closed days are only
    /// included when `include_closed` is set.
    async fn fetch_opening_days_between(
        &self,
        service_point_id: ServicePointId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        include_closed: bool,
    ) -> EngineResult<Vec<OpeningDay>>;
}
