use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::LeaveError;

/// Lifecycle of a leave request. Stored as the lowercase literal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// A stored leave request, as returned by submission and history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "Sick leave")]
    pub type_name: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub days: i32,
    #[schema(example = "Flu")]
    pub reason: String,
    #[schema(example = "+66 81 234 5678", nullable = true)]
    pub contact: Option<String>,
    #[schema(example = "Somchai", nullable = true)]
    pub substitute: Option<String>,
    pub status: LeaveStatus,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,    /// Approver's note, set when the request is approved or rejected.
    #[schema(example = "Enjoy the break", nullable = true)]
    pub decision_comment: Option<String>,
    #[schema(example = "2026-01-02T09:30:00Z", format = "date-time", value_type = Option<String>, nullable = true)]
    pub decided_at: Option<DateTime<Utc>>,
}

/// Submission payload for `POST /leave/request`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeave {
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub days: i32,
    #[schema(example = "Flu")]
    pub reason: String,
    #[schema(nullable = true)]
    pub contact: Option<String>,
    #[schema(nullable = true)]
    pub substitute: Option<String>,
}

/// A submission that passed validation; optional fields are trimmed and
/// empty strings dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeave {
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: String,
    pub contact: Option<String>,
    pub substitute: Option<String>,
}

impl CreateLeave {
    pub fn validate(self) -> Result<NewLeave, LeaveError> {
        let leave_type = self.leave_type.trim().to_lowercase();
        if leave_type.is_empty() {
            return Err(LeaveError::InvalidInput("leaveType is required".into()));
        }

        if self.start_date > self.end_date {
            return Err(LeaveError::InvalidInput(
                "startDate cannot be after endDate".into(),
            ));
        }

        if self.days < 1 {
            return Err(LeaveError::InvalidInput("days must be at least 1".into()));
        }

        let span = (self.end_date - self.start_date).num_days() + 1;
        if i64::from(self.days) > span {
            return Err(LeaveError::InvalidInput(format!(
                "days ({}) exceeds the {} calendar day(s) between startDate and endDate",
                self.days, span
            )));
        }

        let reason = self.reason.trim().to_string();
        if reason.is_empty() {
            return Err(LeaveError::InvalidInput("reason is required".into()));
        }

        Ok(NewLeave {
            leave_type,
            start_date: self.start_date,
            end_date: self.end_date,
            days: self.days,
            reason,
            contact: non_blank(self.contact),
            substitute: non_blank(self.substitute),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
