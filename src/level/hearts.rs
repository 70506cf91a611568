use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    models::HeartsState,
    remote::{RemoteResult, RemoteSync},
};

#[derive(Debug, Default)]
struct HeartsEntry {
    state: Option<HeartsState>,
    stale: bool,
}

/// Last authoritative hearts balance, shared by whoever displays or spends
/// hearts. Only ever replaced from a backend response.
#[derive(Debug, Clone, Default)]
pub struct HeartsCache {
    inner: Arc<RwLock<HeartsEntry>>,
}

impl HeartsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<HeartsState> {
        self.read().state.clone()
    }

    pub fn replace(&self, state: HeartsState) {
        let mut entry = self.write();
        entry.state = Some(state);
        entry.stale = false;
    }

    /// A consume call failed; the cached balance may be ahead of the server.
    pub fn mark_stale(&self) {
        self.write().stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.read().stale
    }

    pub async fn refresh(&self, remote: &dyn RemoteSync) -> RemoteResult<HeartsState> {
        let state = remote.get_hearts().await?;
        self.replace(state.clone());
        Ok(state)
    }

    fn read(&self) -> RwLockReadGuard<'_, HeartsEntry> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HeartsEntry> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRemote;

    #[tokio::test]
    async fn refresh_replaces_and_clears_stale() {
        let remote = FakeRemote::new(Vec::new()).with_hearts(4);
        let cache = HeartsCache::new();
        assert!(cache.snapshot().is_none());

        cache.mark_stale();
        assert!(cache.is_stale());

        let state = cache.refresh(&remote).await.unwrap();
        assert_eq!(state.hearts, 4);
        assert_eq!(cache.snapshot(), Some(state));
        assert!(!cache.is_stale());
    }

    #[test]
    fn clones_share_the_balance() {
        let cache = HeartsCache::new();
        let other = cache.clone();
        cache.replace(HeartsState {
            hearts: 2,
            next_refill_at: None,
        });
        assert_eq!(other.snapshot().map(|s| s.hearts), Some(2));
    }
}
