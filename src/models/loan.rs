//! Loan model and service point identifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a service point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServicePointId(pub Uuid);

impl ServicePointId {
    /// A fresh random identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ServicePointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The facts about a loan the calculations need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    /// Loan identifier.
    pub id: String,
    /// When the item was checked out.
    pub loan_date: DateTime<Utc>,
    /// Current due date.
    pub due_date: DateTime<Utc>,
    /// Service point where the item was checked out.
    pub checkout_service_point_id: ServicePointId,
    /// Primary service point of the item's location, if it has one.
    #[serde(default)]
    pub item_primary_service_point_id: Option<ServicePointId>,
    /// Whether a recall moved the due date.
    #[serde(default)]
    pub due_date_changed_by_recall: bool,
}

impl Loan {
    /// Creates a loan whose item lives at the checkout service point.
    pub fn new(
        id: impl Into<String>,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
        service_point_id: ServicePointId,
    ) -> Self {
        Self {
            id: id.into(),
            loan_date,
            due_date,
            checkout_service_point_id: service_point_id,
            item_primary_service_point_id: Some(service_point_id),
            due_date_changed_by_recall: false,
        }
    }

    /// Whether the loan is past due at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_overdue_is_strict() {
        let due = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let loan = Loan::new("loan-1", due, due, ServicePointId::new_v4());
        assert!(!loan.is_overdue(due));
        assert!(loan.is_overdue(due + chrono::TimeDelta::seconds(1)));
    }

    #[test]
    fn test_loan_deserialization_defaults() {
        let json = r#"{
            "id": "loan-1",
            "loan_date": "2026-02-01T10:00:00Z",
            "due_date": "2026-02-22T23:59:59Z",
            "checkout_service_point_id": "7c5abc9f-f3d7-4856-b8d7-6712462ca007"
        }"#;
        let loan: Loan = serde_json::from_str(json).unwrap();
        assert!(loan.item_primary_service_point_id.is_none());
        assert!(!loan.due_date_changed_by_recall);
    }
}
