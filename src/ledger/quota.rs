use std::collections::HashMap;

use crate::error::LeaveError;
use crate::model::{LeaveSummary, LeaveType};

/// Decides whether `days` more fit into `quota` given `used`.
pub fn check_quota(quota: i32, used: i32, days: i32) -> Result<(), LeaveError> {
    let remaining = quota - used;
    if remaining < days {
        return Err(LeaveError::QuotaExceeded { remaining });
    }
    Ok(())
}

/// One summary row per leave type, in catalogue order. Types the user never
/// used report zero.
pub fn summarize(types: &[LeaveType], used: &HashMap<String, i32>) -> Vec<LeaveSummary> {
    types
        .iter()
        .map(|t| {
            let used = used.get(&t.id).copied().unwrap_or(0);
            LeaveSummary {
                leave_type: t.id.clone(),
                name: t.name.clone(),
                quota: t.quota,
                used,
                remaining: t.quota - used,
            }
        })
        .collect()
}
