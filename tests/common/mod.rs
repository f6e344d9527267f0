//! Common test utilities and helpers
//!
//! `MemoryStore` is an in-memory `LeaveStore` that runs the real `Ledger`
//! algorithm. A transaction holds the store lock from `begin` until it ends
//! and works on a copy of the state that only `commit` writes back.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use futures::lock::{Mutex, OwnedMutexGuard};

use leave_ledger::auth::jwt::generate_access_token;
use leave_ledger::config::{Config, QuotaPolicy};
use leave_ledger::error::{LeaveError, LeaveResult};
use leave_ledger::ledger::{LeaveStore, LedgerTx, Ledger};
use leave_ledger::model::{LeaveRecord, LeaveStatus, LeaveType, NewLeave};
use leave_ledger::utils::leave_type_cache::LeaveTypeCache;

pub const JWT_SECRET: &str = "test-secret";

pub const EMPLOYEE_ID: u64 = 1000;
pub const OTHER_EMPLOYEE_ID: u64 = 1001;
pub const HR_ID: u64 = 2;

/// Builds the full application (routes, auth, governor) around `$ledger`,
/// a `web::Data<Ledger>`.
macro_rules! init_app {
    ($ledger:expr) => {{
        let config = actix_web::web::Data::new(common::test_config());
        let limiter = leave_ledger::routes::rate_limit(10_000);
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(config.clone())
                .app_data($ledger.clone())
                .configure(|cfg| leave_ledger::routes::configure(cfg, &config, &limiter)),
        )
        .await
    }};
}

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "mysql://unused"),
        ("JWT_SECRET", JWT_SECRET),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("test config must load")
}

pub fn employee_token(user_id: u64) -> String {
    token_for(user_id, "employee", 3)
}

pub fn hr_token() -> String {
    token_for(HR_ID, "hr", 2)
}

fn token_for(user_id: u64, username: &str, role: u8) -> String {
    generate_access_token(user_id, username.to_string(), role, JWT_SECRET, 3600)
        .expect("Failed to sign token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub fn seed_types() -> Vec<LeaveType> {
    [
        ("sick", "Sick leave", 30, "#ef4444"),
        ("personal", "Personal leave", 10, "#f59e0b"),
        ("vacation", "Vacation leave", 10, "#10b981"),
        ("maternity", "Maternity leave", 90, "#ec4899"),
    ]
    .into_iter()
    .map(|(id, name, quota, color)| LeaveType {
        id: id.into(),
        name: name.into(),
        quota,
        color: color.into(),
    })
    .collect()
}

pub fn ledger(store: Arc<MemoryStore>, policy: QuotaPolicy) -> actix_web::web::Data<Ledger> {
    actix_web::web::Data::new(Ledger::new(
        store,
        policy,
        LeaveTypeCache::new(std::time::Duration::from_secs(60)),
    ))
}

#[derive(Clone, Default)]
struct State {
    types: Vec<LeaveType>,
    used: HashMap<(u64, String), i32>,
    requests: Vec<LeaveRecord>,
    next_id: u64,
}

pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    healthy: AtomicBool,
    fail_counter_updates: AtomicBool,
}

impl MemoryStore {
    pub fn seeded() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(State {
                types: seed_types(),
                next_id: 1,
                ..State::default()
            })),
            healthy: AtomicBool::new(true),
            fail_counter_updates: AtomicBool::new(false),
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Makes `add_used_days` fail in transactions begun from now on, after
    /// the request row has already been written.
    pub fn fail_counter_updates(&self, fail: bool) {
        self.fail_counter_updates.store(fail, Ordering::SeqCst);
    }

    /// Counter value as the submit policy tracks it.
    pub async fn counter(&self, user_id: u64, leave_type: &str) -> i32 {
        let state = self.state.lock().await;
        state
            .used
            .get(&(user_id, leave_type.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub async fn request_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn begin(&self) -> LeaveResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_counter_updates: self.fail_counter_updates.load(Ordering::SeqCst),
        }))
    }

    async fn leave_types(&self) -> LeaveResult<Vec<LeaveType>> {
        Ok(self.state.lock().await.types.clone())
    }

    async fn used_days(
        &self,
        user_id: u64,
        policy: QuotaPolicy,
    ) -> LeaveResult<HashMap<String, i32>> {
        let state = self.state.lock().await;
        let used = match policy {
            QuotaPolicy::Submit => state
                .used
                .iter()
                .filter(|((user, _), _)| *user == user_id)
                .map(|((_, leave_type), days)| (leave_type.clone(), *days))
                .collect(),
            QuotaPolicy::Approved => {
                let mut used = HashMap::new();
                for r in state
                    .requests
                    .iter()
                    .filter(|r| r.user_id == user_id && r.status == LeaveStatus::Approved)
                {
                    *used.entry(r.leave_type.clone()).or_insert(0) += r.days;
                }
                used
            }
        };
        Ok(used)
    }

    async fn history(
        &self,
        user_id: u64,
        leave_type: Option<&str>,
    ) -> LeaveResult<Vec<LeaveRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<LeaveRecord> = state
            .requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| leave_type.is_none_or(|t| r.leave_type == t))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn requests(
        &self,
        status: Option<LeaveStatus>,
        leave_type: Option<&str>,
    ) -> LeaveResult<Vec<LeaveRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<LeaveRecord> = state
            .requests
            .iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .filter(|r| leave_type.is_none_or(|t| r.leave_type == t))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn set_status(
        &self,
        request_id: u64,
        status: LeaveStatus,
        comment: Option<&str>,
    ) -> LeaveResult<()> {
        let mut state = self.state.lock().await;
        let record = state
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| LeaveError::NotFound("Leave request not found".into()))?;

        if record.status != LeaveStatus::Pending {
            return Err(LeaveError::AlreadyDecided(request_id));
        }
        record.status = status;
        record.decision_comment = comment.map(str::to_string);
        record.decided_at = Some(Utc::now());
        Ok(())
    }

    async fn ping(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
    fail_counter_updates: bool,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn leave_type_quota(&mut self, leave_type: &str) -> LeaveResult<Option<i32>> {
        Ok(self
            .working
            .types
            .iter()
            .find(|t| t.id == leave_type)
            .map(|t| t.quota))
    }

    async fn lock_entitlement(&mut self, user_id: u64, leave_type: &str) -> LeaveResult<i32> {
        Ok(*self
            .working
            .used
            .entry((user_id, leave_type.to_string()))
            .or_insert(0))
    }

    async fn approved_days(&mut self, user_id: u64, leave_type: &str) -> LeaveResult<i32> {
        Ok(self
            .working
            .requests
            .iter()
            .filter(|r| {
                r.user_id == user_id
                    && r.leave_type == leave_type
                    && r.status == LeaveStatus::Approved
            })
            .map(|r| r.days)
            .sum())
    }

    async fn insert_request(&mut self, user_id: u64, leave: &NewLeave) -> LeaveResult<LeaveRecord> {
        let type_name = self
            .working
            .types
            .iter()
            .find(|t| t.id == leave.leave_type)
            .map(|t| t.name.clone())
            .unwrap_or_default();

        let record = LeaveRecord {
            id: self.working.next_id,
            user_id,
            leave_type: leave.leave_type.clone(),
            type_name,
            start_date: leave.start_date,
            end_date: leave.end_date,
            days: leave.days,
            reason: leave.reason.clone(),
            contact: leave.contact.clone(),
            substitute: leave.substitute.clone(),
            status: LeaveStatus::Pending,
            created_at: Utc::now(),
            decision_comment: None,
            decided_at: None,
        };
        self.working.next_id += 1;
        self.working.requests.push(record.clone());
        Ok(record)
    }

    async fn add_used_days(
        &mut self,
        user_id: u64,
        leave_type: &str,
        days: i32,
    ) -> LeaveResult<()> {
        if self.fail_counter_updates {
            return Err(LeaveError::Persistence(sqlx::Error::Protocol(
                "counter update failed".into(),
            )));
        }
        *self
            .working
            .used
            .entry((user_id, leave_type.to_string()))
            .or_insert(0) += days;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> LeaveResult<()> {
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> LeaveResult<()> {
        Ok(())
    }
}
