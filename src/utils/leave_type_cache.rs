use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::error::LeaveResult;
use crate::ledger::LeaveStore;
use crate::model::LeaveType;

const ALL_TYPES: &str = "all";

/// In-memory copy of the leave type catalogue. Leave types are seeded once,
/// so a TTL refresh is enough.
#[derive(Clone)]
pub struct LeaveTypeCache {
    cache: Cache<&'static str, Arc<Vec<LeaveType>>>,
}

impl LeaveTypeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get_or_load(&self, store: &dyn LeaveStore) -> LeaveResult<Arc<Vec<LeaveType>>> {
        if let Some(types) = self.cache.get(ALL_TYPES).await {
            return Ok(types);
        }

        let types = Arc::new(store.leave_types().await?);
        self.cache.insert(ALL_TYPES, types.clone()).await;

        tracing::debug!(count = types.len(), "Leave type cache refreshed");
        Ok(types)
    }
}
