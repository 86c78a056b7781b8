//! Per-campaign run serialization

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Registry of one async mutex per campaign id
#[derive(Debug, Clone, Default)]
pub struct CampaignLocks {
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl CampaignLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other run holds `campaign_id`, then hold it until the
    /// guard drops
    pub async fn acquire(&self, campaign_id: &str) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(campaign_id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => self
                .locks
                .write()
                .await
                .entry(campaign_id.to_string())
                .or_default()
                .clone(),
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_campaign_is_serialized() {
        let locks = CampaignLocks::new();
        let guard = locks.acquire("c1").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("c1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("second run should proceed once the first releases")
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_campaigns_do_not_block() {
        let locks = CampaignLocks::new();
        let _a = locks.acquire("c1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("c2")).await;
        assert!(b.is_ok());
    }
}
