//! The leave quota ledger.
//!
//! A submission runs as one transaction: read the quota for the leave type,
//! lock the caller's counter for that type, and either record the request
//! and bump the counter or roll back with nothing written. Storage sits
//! behind [`LeaveStore`] and [`LedgerTx`]; the MySQL implementation lives in
//! [`mysql`].

pub mod mysql;
pub mod quota;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::QuotaPolicy;
use crate::error::{LeaveError, LeaveResult};
use crate::model::{LeaveRecord, LeaveStatus, LeaveSummary, LeaveType, NewLeave};
use crate::utils::leave_type_cache::LeaveTypeCache;

pub use mysql::MySqlLeaveStore;

const MAX_COMMENT_CHARS: usize = 500;

/// One open ledger transaction. Dropping it without `commit` discards every
/// write made through it.
#[async_trait]
pub trait LedgerTx: Send {
    /// Quota of a leave type, `None` if the type is unknown.
    async fn leave_type_quota(&mut self, leave_type: &str) -> LeaveResult<Option<i32>>;

    /// Exclusively locks the (user, type) counter until the transaction ends
    /// and returns its value. A missing counter is created at zero.
    async fn lock_entitlement(&mut self, user_id: u64, leave_type: &str) -> LeaveResult<i32>;

    /// Sum of days over the user's approved requests of this type.
    async fn approved_days(&mut self, user_id: u64, leave_type: &str) -> LeaveResult<i32>;

    /// Inserts a pending request and returns it as stored.
    async fn insert_request(&mut self, user_id: u64, leave: &NewLeave) -> LeaveResult<LeaveRecord>;

    /// Adds `days` to a counter previously locked with `lock_entitlement`.
    async fn add_used_days(&mut self, user_id: u64, leave_type: &str, days: i32)
    -> LeaveResult<()>;

    async fn commit(self: Box<Self>) -> LeaveResult<()>;

    async fn rollback(self: Box<Self>) -> LeaveResult<()>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn begin(&self) -> LeaveResult<Box<dyn LedgerTx>>;

    async fn leave_types(&self) -> LeaveResult<Vec<LeaveType>>;

    /// Days consumed per leave type for one user, counted the way `policy`
    /// says.
    async fn used_days(
        &self,
        user_id: u64,
        policy: QuotaPolicy,
    ) -> LeaveResult<HashMap<String, i32>>;

    /// The user's requests, newest first, optionally of one type only.
    async fn history(&self, user_id: u64, leave_type: Option<&str>)
    -> LeaveResult<Vec<LeaveRecord>>;

    /// Requests across all users, newest first. `None` filters match
    /// everything.
    async fn requests(
        &self,
        status: Option<LeaveStatus>,
        leave_type: Option<&str>,
    ) -> LeaveResult<Vec<LeaveRecord>>;

    /// Moves a pending request to `status`, stamping the decision time.
    async fn set_status(
        &self,
        request_id: u64,
        status: LeaveStatus,
        comment: Option<&str>,
    ) -> LeaveResult<()>;

    async fn ping(&self) -> bool;
}

/// Entry point for every leave operation. Built once at startup and shared
/// through `web::Data`.
pub struct Ledger {
    store: Arc<dyn LeaveStore>,
    policy: QuotaPolicy,
    types: LeaveTypeCache,
}

impl Ledger {
    pub fn new(store: Arc<dyn LeaveStore>, policy: QuotaPolicy, types: LeaveTypeCache) -> Self {
        Self {
            store,
            policy,
            types,
        }
    }

    pub async fn leave_types(&self) -> LeaveResult<Arc<Vec<LeaveType>>> {
        self.types.get_or_load(self.store.as_ref()).await
    }

    /// Records a leave request if the user's remaining quota covers it.
    pub async fn submit(&self, user_id: u64, leave: NewLeave) -> LeaveResult<LeaveRecord> {
        let mut tx = self.store.begin().await?;

        match self.submit_in(tx.as_mut(), user_id, &leave).await {
            Ok(record) => {
                tx.commit().await?;
                info!(
                    user_id,
                    leave_type = %leave.leave_type,
                    days = leave.days,
                    request_id = record.id,
                    "Leave request recorded"
                );
                Ok(record)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, user_id, "Ledger rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn submit_in(
        &self,
        tx: &mut dyn LedgerTx,
        user_id: u64,
        leave: &NewLeave,
    ) -> LeaveResult<LeaveRecord> {
        let quota = tx
            .leave_type_quota(&leave.leave_type)
            .await?
            .ok_or_else(|| LeaveError::UnknownLeaveType(leave.leave_type.clone()))?;

        let used = match self.policy {
            QuotaPolicy::Submit => tx.lock_entitlement(user_id, &leave.leave_type).await?,
            QuotaPolicy::Approved => tx.approved_days(user_id, &leave.leave_type).await?,
        };

        if let Err(err) = quota::check_quota(quota, used, leave.days) {
            info!(
                user_id,
                leave_type = %leave.leave_type,
                days = leave.days,
                quota,
                used,
                "Leave request exceeds quota"
            );
            return Err(err);
        }

        let record = tx.insert_request(user_id, leave).await?;

        if self.policy == QuotaPolicy::Submit {
            tx.add_used_days(user_id, &leave.leave_type, leave.days)
                .await?;
        }

        Ok(record)
    }

    pub async fn summary(&self, user_id: u64) -> LeaveResult<Vec<LeaveSummary>> {
        let types = self.leave_types().await?;
        let used = self.store.used_days(user_id, self.policy).await?;

        let summary = quota::summarize(&types, &used);
        for row in summary.iter().filter(|row| row.remaining < 0) {
            warn!(
                user_id,
                leave_type = %row.leave_type,
                quota = row.quota,
                used = row.used,
                "Leave usage exceeds quota"
            );
        }

        Ok(summary)
    }

    /// `leave_type` of `None`, empty or `all` returns every type.
    pub async fn history(
        &self,
        user_id: u64,
        leave_type: Option<&str>,
    ) -> LeaveResult<Vec<LeaveRecord>> {
        let filter = type_filter(leave_type);
        self.store.history(user_id, filter.as_deref()).await
    }

    /// Requests of every user for approvers. `status` defaults to pending;
    /// `all` lifts the status filter.
    pub async fn requests(
        &self,
        status: Option<&str>,
        leave_type: Option<&str>,
    ) -> LeaveResult<Vec<LeaveRecord>> {
        let status = status_filter(status)?;
        let filter = type_filter(leave_type);
        self.store.requests(status, filter.as_deref()).await
    }

    /// Approves or rejects a pending request, keeping the approver's comment.
    pub async fn decide(
        &self,
        request_id: u64,
        status: LeaveStatus,
        comment: Option<&str>,
        decided_by: &str,
    ) -> LeaveResult<()> {
        if status == LeaveStatus::Pending {
            return Err(LeaveError::InvalidInput(
                "a decision must approve or reject".into(),
            ));
        }

        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        if comment.is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS) {
            return Err(LeaveError::InvalidInput(format!(
                "comment must be at most {MAX_COMMENT_CHARS} characters"
            )));
        }

        self.store.set_status(request_id, status, comment).await?;
        info!(request_id, status = %status, decided_by, "Leave request decided");
        Ok(())
    }

    pub async fn is_healthy(&self) -> bool {
        self.store.ping().await
    }
}

fn type_filter(leave_type: Option<&str>) -> Option<String> {
    leave_type
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase)
}

fn status_filter(status: Option<&str>) -> LeaveResult<Option<LeaveStatus>> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Some(LeaveStatus::Pending)),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s
            .to_lowercase()
            .parse::<LeaveStatus>()
            .map(Some)
            .map_err(|_| LeaveError::InvalidInput(format!("Invalid status: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, Some(LeaveStatus::Pending))]
    #[case(Some(""), Some(LeaveStatus::Pending))]
    #[case(Some("all"), None)]
    #[case(Some("Approved"), Some(LeaveStatus::Approved))]
    #[case(Some(" rejected "), Some(LeaveStatus::Rejected))]
    fn status_filter_defaults_to_pending(
        #[case] raw: Option<&str>,
        #[case] expected: Option<LeaveStatus>,
    ) {
        assert_eq!(status_filter(raw).unwrap(), expected);
    }

    #[test]
    fn unknown_status_filter_is_rejected() {
        assert!(matches!(
            status_filter(Some("cancelled")),
            Err(LeaveError::InvalidInput(_))
        ));
    }

    #[test]
    fn type_filter_treats_all_as_no_filter() {
        assert_eq!(type_filter(Some(" ALL ")), None);
        assert_eq!(type_filter(None), None);
        assert_eq!(type_filter(Some("Sick")).as_deref(), Some("sick"));
    }
}
