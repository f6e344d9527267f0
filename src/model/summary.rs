use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveSummary {
    #[serde(rename = "type")]
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "Sick leave")]
    pub name: String,
    #[schema(example = 30)]
    pub quota: i32,
    #[schema(example = 12)]
    pub used: i32,
    /// `quota - used`; negative only when approvals pushed usage past the quota.
    #[schema(example = 18)]
    pub remaining: i32,
}
