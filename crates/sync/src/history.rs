//! Bounded in-memory history of sync operation results.

use std::collections::VecDeque;

use tokio::sync::RwLock;

use crate::result::SyncOperationResult;

/// Newest-first ring of recent operation results.
///
/// Ephemeral by design: results live here and on the completion event, never
/// in the store.
pub struct SyncHistory {
    limit: usize,
    entries: RwLock<VecDeque<SyncOperationResult>>,
}

impl SyncHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: RwLock::new(VecDeque::with_capacity(limit.min(64))),
        }
    }

    /// Append a result, evicting the oldest entry past the capacity.
    pub async fn record(&self, result: SyncOperationResult) {
        let mut entries = self.entries.write().await;
        entries.push_front(result);
        while entries.len() > self.limit {
            entries.pop_back();
        }
    }

    /// Most recent results, newest first. `limit = None` returns everything
    /// retained.
    pub async fn recent(&self, limit: Option<usize>) -> Vec<SyncOperationResult> {
        let entries = self.entries.read().await;
        let take = limit.unwrap_or(entries.len());
        entries.iter().take(take).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
