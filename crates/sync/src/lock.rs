//! In-memory advisory lock registry with TTL expiry.
//!
//! Locks are logical only -- they serialize sync operations on the same
//! scope within this process, never the underlying store. A second acquirer
//! of a live key fails fast; there is no queueing or fairness, retry is the
//! caller's responsibility. Expired keys are purged on the next acquire, so
//! a crashed operation that never released blocks its scope for at most one
//! TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::result::SyncOperationKind;

struct LockEntry {
    operation_id: String,
    kind: SyncOperationKind,
    expires_at: Instant,
}

/// Advisory mutual-exclusion registry keyed by
/// (project, dispatch, material set).
pub struct LockManager {
    ttl: Duration,
    locks: Mutex<HashMap<String, LockEntry>>,
}

impl LockManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Deterministic scope key: project + dispatch (or `all`) + sorted
    /// material ids, so the same material set locks the same key regardless
    /// of input order.
    pub fn scope_key(project_id: &str, dispatch_id: Option<&str>, material_ids: &[String]) -> String {
        let mut ids: Vec<&str> = material_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        format!(
            "{project_id}:{}:{}",
            dispatch_id.unwrap_or("all"),
            ids.join(",")
        )
    }

    /// Try to take the lock for the given scope.
    ///
    /// Returns `false` when a live lock exists. Expired entries are purged
    /// first, so staleness is bounded by the TTL.
    pub async fn acquire(
        &self,
        operation_id: &str,
        kind: SyncOperationKind,
        project_id: &str,
        material_ids: &[String],
        dispatch_id: Option<&str>,
    ) -> bool {
        let key = Self::scope_key(project_id, dispatch_id, material_ids);
        let now = Instant::now();
        let mut locks = self.locks.lock().await;
        locks.retain(|_, entry| entry.expires_at > now);

        if let Some(holder) = locks.get(&key) {
            tracing::debug!(
                key = %key,
                holder = %holder.operation_id,
                holder_kind = holder.kind.as_str(),
                "Lock unavailable",
            );
            return false;
        }

        locks.insert(
            key,
            LockEntry {
                operation_id: operation_id.to_string(),
                kind,
                expires_at: now + self.ttl,
            },
        );
        true
    }

    /// Release the lock for the given scope.
    ///
    /// Unconditional and idempotent: safe to call when the key is absent or
    /// already expired.
    pub async fn release(&self, project_id: &str, material_ids: &[String], dispatch_id: Option<&str>) {
        let key = Self::scope_key(project_id, dispatch_id, material_ids);
        self.locks.lock().await.remove(&key);
    }

    /// Number of live (non-expired) locks.
    pub async fn active_count(&self) -> usize {
        let now = Instant::now();
        let mut locks = self.locks.lock().await;
        locks.retain(|_, entry| entry.expires_at > now);
        locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIND: SyncOperationKind = SyncOperationKind::DispatchToProject;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn second_acquire_on_same_scope_fails() {
        let manager = LockManager::new(Duration::from_secs(30));
        let materials = ids(&["m1", "m2"]);
        assert!(manager.acquire("op-1", KIND, "proj-1", &materials, Some("dn-1")).await);
        assert!(!manager.acquire("op-2", KIND, "proj-1", &materials, Some("dn-1")).await);
    }

    #[tokio::test]
    async fn disjoint_scopes_lock_independently() {
        let manager = LockManager::new(Duration::from_secs(30));
        assert!(manager.acquire("op-1", KIND, "proj-1", &ids(&["m1"]), Some("dn-1")).await);
        assert!(manager.acquire("op-2", KIND, "proj-1", &ids(&["m2"]), Some("dn-2")).await);
        assert!(manager.acquire("op-3", KIND, "proj-2", &ids(&["m1"]), Some("dn-1")).await);
        assert_eq!(manager.active_count().await, 3);
    }

    #[tokio::test]
    async fn material_order_does_not_change_the_key() {
        let manager = LockManager::new(Duration::from_secs(30));
        assert!(manager.acquire("op-1", KIND, "proj-1", &ids(&["b", "a"]), None).await);
        assert!(!manager.acquire("op-2", KIND, "proj-1", &ids(&["a", "b"]), None).await);
    }

    #[tokio::test]
    async fn release_frees_the_scope() {
        let manager = LockManager::new(Duration::from_secs(30));
        let materials = ids(&["m1"]);
        assert!(manager.acquire("op-1", KIND, "proj-1", &materials, None).await);
        manager.release("proj-1", &materials, None).await;
        assert!(manager.acquire("op-2", KIND, "proj-1", &materials, None).await);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let manager = LockManager::new(Duration::from_secs(30));
        let materials = ids(&["m1"]);
        manager.release("proj-1", &materials, None).await;
        manager.release("proj-1", &materials, None).await;
        assert!(manager.acquire("op-1", KIND, "proj-1", &materials, None).await);
    }

    #[tokio::test]
    async fn expired_locks_are_purged_on_acquire() {
        let manager = LockManager::new(Duration::ZERO);
        let materials = ids(&["m1"]);
        assert!(manager.acquire("op-1", KIND, "proj-1", &materials, None).await);
        // TTL of zero: the previous lock is already expired.
        assert!(manager.acquire("op-2", KIND, "proj-1", &materials, None).await);
    }

    #[tokio::test]
    async fn missing_dispatch_id_uses_the_all_scope() {
        let key = LockManager::scope_key("proj-1", None, &ids(&["m1"]));
        assert_eq!(key, "proj-1:all:m1");
    }
}
