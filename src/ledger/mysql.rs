use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{MySql, MySqlPool, Transaction, prelude::FromRow};

use crate::config::QuotaPolicy;
use crate::error::{LeaveError, LeaveResult};
use crate::ledger::{LeaveStore, LedgerTx};
use crate::model::{LeaveRecord, LeaveStatus, LeaveType, NewLeave};

const RECORD_COLUMNS: &str = r#"
    lr.id,
    lr.user_id,
    lr.leave_type,
    lt.name AS type_name,
    lr.start_date,
    lr.end_date,
    lr.days,
    lr.reason,
    lr.contact,
    lr.substitute,
    lr.status,
    lr.created_at,
    lr.decision_comment,
    lr.decided_at
"#;

#[derive(FromRow)]
struct LeaveRecordRow {
    id: u64,
    user_id: u64,
    leave_type: String,
    type_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: i32,
    reason: String,
    contact: Option<String>,
    substitute: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    decision_comment: Option<String>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeaveRecordRow> for LeaveRecord {
    type Error = LeaveError;

    fn try_from(row: LeaveRecordRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<LeaveStatus>()
            .map_err(|e| LeaveError::Persistence(sqlx::Error::Decode(e.into())))?;

        Ok(LeaveRecord {
            id: row.id,
            user_id: row.user_id,
            leave_type: row.leave_type,
            type_name: row.type_name,
            start_date: row.start_date,
            end_date: row.end_date,
            days: row.days,
            reason: row.reason,
            contact: row.contact,
            substitute: row.substitute,
            status,
            created_at: row.created_at,
            decision_comment: row.decision_comment,
            decided_at: row.decided_at,
        })
    }
}

fn saturating_days(total: i64) -> i32 {
    i32::try_from(total).unwrap_or(i32::MAX)
}

/// Leave storage on MySQL/InnoDB. Quota checks rely on `SELECT ... FOR
/// UPDATE` row locks, so concurrent submissions for one (user, type) pair
/// serialize while other pairs proceed.
#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
    lock_wait_timeout_secs: u32,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool, lock_wait_timeout_secs: u32) -> Self {
        Self {
            pool,
            lock_wait_timeout_secs,
        }
    }
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn begin(&self) -> LeaveResult<Box<dyn LedgerTx>> {
        let mut tx = self.pool.begin().await?;

        // bounds every row-lock wait in this transaction
        let set_timeout = format!(
            "SET SESSION innodb_lock_wait_timeout = {}",
            self.lock_wait_timeout_secs.max(1)
        );
        sqlx::query(&set_timeout).execute(&mut *tx).await?;

        Ok(Box::new(MySqlLedgerTx { tx }))
    }

    async fn leave_types(&self) -> LeaveResult<Vec<LeaveType>> {
        let types = sqlx::query_as::<_, LeaveType>(
            r#"
            SELECT id, name, quota, color
            FROM leave_types
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }

    async fn used_days(
        &self,
        user_id: u64,
        policy: QuotaPolicy,
    ) -> LeaveResult<HashMap<String, i32>> {
        let used: HashMap<String, i32> = match policy {
            QuotaPolicy::Submit => sqlx::query_as::<_, (String, i32)>(
                r#"
                SELECT leave_type_id, used_days
                FROM leave_entitlements
                WHERE user_id = ?
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .collect(),

            QuotaPolicy::Approved => sqlx::query_as::<_, (String, i64)>(
                r#"
                SELECT leave_type, CAST(SUM(days) AS SIGNED)
                FROM leave_requests
                WHERE user_id = ?
                AND status = ?
                GROUP BY leave_type
                "#,
            )
            .bind(user_id)
            .bind(LeaveStatus::Approved.as_ref())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|(leave_type, total)| (leave_type, saturating_days(total)))
            .collect(),
        };

        Ok(used)
    }

    async fn history(
        &self,
        user_id: u64,
        leave_type: Option<&str>,
    ) -> LeaveResult<Vec<LeaveRecord>> {
        let mut sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM leave_requests lr
            JOIN leave_types lt ON lt.id = lr.leave_type
            WHERE lr.user_id = ?
            "#
        );
        if leave_type.is_some() {
            sql.push_str(" AND lr.leave_type = ?");
        }
        sql.push_str(" ORDER BY lr.created_at DESC, lr.id DESC");

        let mut query = sqlx::query_as::<_, LeaveRecordRow>(&sql).bind(user_id);
        if let Some(leave_type) = leave_type {
            query = query.bind(leave_type);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveRecord::try_from)
            .collect()
    }

    async fn requests(
        &self,
        status: Option<LeaveStatus>,
        leave_type: Option<&str>,
    ) -> LeaveResult<Vec<LeaveRecord>> {
        let mut sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM leave_requests lr
            JOIN leave_types lt ON lt.id = lr.leave_type
            WHERE 1 = 1
            "#
        );
        if status.is_some() {
            sql.push_str(" AND lr.status = ?");
        }
        if leave_type.is_some() {
            sql.push_str(" AND lr.leave_type = ?");
        }
        sql.push_str(" ORDER BY lr.created_at DESC, lr.id DESC");

        let mut query = sqlx::query_as::<_, LeaveRecordRow>(&sql);
        if let Some(status) = status {
            query = query.bind(status.to_string());
        }
        if let Some(leave_type) = leave_type {
            query = query.bind(leave_type);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveRecord::try_from)
            .collect()
    }

    async fn set_status(
        &self,
        request_id: u64,
        status: LeaveStatus,
        comment: Option<&str>,
    ) -> LeaveResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, decision_comment = ?, decided_at = CURRENT_TIMESTAMP(6)
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(status.as_ref())
        .bind(comment)
        .bind(request_id)
        .bind(LeaveStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists = sqlx::query_scalar::<_, u64>("SELECT id FROM leave_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Err(LeaveError::AlreadyDecided(request_id)),
            None => Err(LeaveError::NotFound(format!(
                "Leave request {request_id} not found"
            ))),
        }
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

pub struct MySqlLedgerTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl LedgerTx for MySqlLedgerTx {
    async fn leave_type_quota(&mut self, leave_type: &str) -> LeaveResult<Option<i32>> {
        let quota = sqlx::query_scalar::<_, i32>("SELECT quota FROM leave_types WHERE id = ?")
            .bind(leave_type)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(quota)
    }

    async fn lock_entitlement(&mut self, user_id: u64, leave_type: &str) -> LeaveResult<i32> {
        // The no-op upsert creates a missing counter and takes the row's
        // exclusive lock in both cases.
        sqlx::query(
            r#"
            INSERT INTO leave_entitlements (user_id, leave_type_id, used_days)
            VALUES (?, ?, 0)
            ON DUPLICATE KEY UPDATE used_days = used_days
            "#,
        )
        .bind(user_id)
        .bind(leave_type)
        .execute(&mut *self.tx)
        .await?;

        let used = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT used_days
            FROM leave_entitlements
            WHERE user_id = ?
            AND leave_type_id = ?
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(leave_type)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(used)
    }

    async fn approved_days(&mut self, user_id: u64, leave_type: &str) -> LeaveResult<i32> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT CAST(COALESCE(SUM(days), 0) AS SIGNED)
            FROM leave_requests
            WHERE user_id = ?
            AND leave_type = ?
            AND status = ?
            "#,
        )
        .bind(user_id)
        .bind(leave_type)
        .bind(LeaveStatus::Approved.as_ref())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(saturating_days(total))
    }

    async fn insert_request(&mut self, user_id: u64, leave: &NewLeave) -> LeaveResult<LeaveRecord> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (user_id, leave_type, start_date, end_date, days, reason, contact, substitute, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&leave.leave_type)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(leave.days)
        .bind(&leave.reason)
        .bind(&leave.contact)
        .bind(&leave.substitute)
        .bind(LeaveStatus::Pending.as_ref())
        .execute(&mut *self.tx)
        .await?;

        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM leave_requests lr
            JOIN leave_types lt ON lt.id = lr.leave_type
            WHERE lr.id = ?
            "#
        );
        let row = sqlx::query_as::<_, LeaveRecordRow>(&sql)
            .bind(inserted.last_insert_id())
            .fetch_one(&mut *self.tx)
            .await?;

        LeaveRecord::try_from(row)
    }

    async fn add_used_days(
        &mut self,
        user_id: u64,
        leave_type: &str,
        days: i32,
    ) -> LeaveResult<()> {
        sqlx::query(
            r#"
            INSERT INTO leave_entitlements (user_id, leave_type_id, used_days)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE used_days = used_days + ?
            "#,
        )
        .bind(user_id)
        .bind(leave_type)
        .bind(days)
        .bind(days)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> LeaveResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> LeaveResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
