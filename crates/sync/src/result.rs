//! Aggregated outcome types for sync operations.

use serde::{Deserialize, Serialize};

use matsync_core::types::{RecordId, Timestamp};
use matsync_core::validate::ValidationIssue;

use crate::error::SyncError;

/// Direction of a sync operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncOperationKind {
    DispatchToProject,
    ProjectToDispatch,
}

impl SyncOperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOperationKind::DispatchToProject => "dispatch-to-project",
            SyncOperationKind::ProjectToDispatch => "project-to-dispatch",
        }
    }
}

/// Outcome of one sync call.
///
/// Ephemeral: appended to the bounded in-memory history and carried on the
/// completion event, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOperationResult {
    pub operation_id: RecordId,
    pub kind: SyncOperationKind,
    pub project_id: RecordId,
    /// True when no non-recoverable error was recorded.
    pub success: bool,
    /// Materials written (created + updated).
    pub processed: u32,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub conflicts_detected: u32,
    pub conflicts_resolved: u32,
    pub validation_issues: Vec<ValidationIssue>,
    pub errors: Vec<SyncError>,
    pub rollback_required: bool,
    pub rollback_performed: bool,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl SyncOperationResult {
    pub fn new(
        kind: SyncOperationKind,
        operation_id: impl Into<RecordId>,
        project_id: impl Into<RecordId>,
        started_at: Timestamp,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            kind,
            project_id: project_id.into(),
            success: true,
            processed: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            conflicts_detected: 0,
            conflicts_resolved: 0,
            validation_issues: Vec::new(),
            errors: Vec::new(),
            rollback_required: false,
            rollback_performed: false,
            started_at,
            completed_at: None,
        }
    }

    /// Record an operational error. Non-recoverable errors flip `success`.
    pub fn record_error(&mut self, error: SyncError) {
        if !error.recoverable {
            self.success = false;
        }
        self.errors.push(error);
    }

    /// Stamp completion and recompute `success` from the recorded errors.
    pub fn finalize(&mut self, now: Timestamp) {
        self.success = !self.errors.iter().any(|e| !e.recoverable);
        self.completed_at = Some(now);
    }
}

/// Outcome of a sequential batch of project-to-dispatch syncs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSyncResult {
    pub total_processed: u32,
    pub successful: Vec<RecordId>,
    pub failed: Vec<BatchFailure>,
}

/// One failed item in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub material_id: RecordId,
    pub message: String,
}
