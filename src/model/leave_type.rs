use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reference data: one kind of leave and its yearly quota in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    #[schema(example = "sick")]
    pub id: String,
    #[schema(example = "Sick leave")]
    pub name: String,
    #[schema(example = 30)]
    pub quota: i32,
    #[schema(example = "#ef4444")]
    pub color: String,
}
