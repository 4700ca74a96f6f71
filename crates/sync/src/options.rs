//! Per-call options for the sync operations.

use serde::{Deserialize, Serialize};

use matsync_core::conflict::ConflictStrategy;
use matsync_core::validate::MaterialMatchCriteria;

/// Options for a single sync operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Create project materials for dispatch materials with no counterpart.
    pub create_if_not_exists: bool,
    /// Update project materials that already have a counterpart.
    pub update_existing: bool,
    /// Map and apply statuses; when false, created records get the fixed
    /// default status (Delivered) and updates leave status alone.
    pub sync_status: bool,
    pub match_criteria: MaterialMatchCriteria,
    pub conflict_strategy: ConflictStrategy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            create_if_not_exists: true,
            update_existing: true,
            sync_status: true,
            match_criteria: MaterialMatchCriteria::default(),
            conflict_strategy: ConflictStrategy::LastWriteWins,
        }
    }
}

/// Options for [`batch_sync_project_to_dispatch`](crate::SyncService::batch_sync_project_to_dispatch).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSyncOptions {
    /// When false (default), the batch aborts on the first failed item;
    /// when true, failures are recorded and the batch continues.
    pub continue_on_error: bool,
    pub sync: SyncOptions,
}

/// Options for the transactional single-material wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSyncOptions {
    /// Attempt a compensating update restoring the pre-sync dispatch state
    /// when the forward sync fails.
    pub enable_rollback: bool,
    pub sync: SyncOptions,
}

impl Default for TransactionSyncOptions {
    fn default() -> Self {
        Self {
            enable_rollback: true,
            sync: SyncOptions::default(),
        }
    }
}
