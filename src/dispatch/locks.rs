use crate::types::CampaignId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-campaign mutual exclusion
///
/// Two runs for the same campaign would race on read-then-delete of its folder,
/// so each run holds the campaign's guard from download until cleanup.
/// Runs for different campaigns never contend.
#[derive(Clone, Debug, Default)]
pub struct CampaignLocks {
    inner: Arc<Mutex<HashMap<CampaignId, Arc<AsyncMutex<()>>>>>,
}

impl CampaignLocks {
    /// Empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the campaign's guard
    pub async fn acquire(&self, campaign_id: &CampaignId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries nobody holds or waits on can go
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            table.entry(campaign_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Whether a run currently holds the campaign's guard
    pub fn is_locked(&self, campaign_id: &CampaignId) -> bool {
        let table = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        table
            .get(campaign_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}
