//! Operational sync errors.
//!
//! Distinct from field-level validation findings: a [`SyncError`] records an
//! operational failure, carries a stable code, and is flagged recoverable or
//! not. Recoverable errors (typically stock side effects) are logged and
//! never fail the parent operation; non-recoverable errors fail the
//! operation or material they are attached to.

use serde::{Deserialize, Serialize};

use matsync_core::types::RecordId;

/// Stable error codes attached to operational failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncErrorCode {
    MaterialSyncFailed,
    StockUpdateFailed,
    SyncOperationFailed,
    RollbackFailed,
    LockAcquisitionFailed,
    DispatchMaterialNotFound,
}

impl SyncErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncErrorCode::MaterialSyncFailed => "MATERIAL_SYNC_FAILED",
            SyncErrorCode::StockUpdateFailed => "STOCK_UPDATE_FAILED",
            SyncErrorCode::SyncOperationFailed => "SYNC_OPERATION_FAILED",
            SyncErrorCode::RollbackFailed => "ROLLBACK_FAILED",
            SyncErrorCode::LockAcquisitionFailed => "LOCK_ACQUISITION_FAILED",
            SyncErrorCode::DispatchMaterialNotFound => "DISPATCH_MATERIAL_NOT_FOUND",
        }
    }
}

impl std::fmt::Display for SyncErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operational failure recorded on a sync result.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct SyncError {
    pub code: SyncErrorCode,
    pub message: String,
    /// Material the failure is scoped to, when per-material.
    pub material_id: Option<RecordId>,
    /// Recoverable errors never fail the parent operation.
    pub recoverable: bool,
}

impl SyncError {
    /// A logged-but-tolerated failure.
    pub fn recoverable(
        code: SyncErrorCode,
        message: impl Into<String>,
        material_id: Option<RecordId>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            material_id,
            recoverable: true,
        }
    }

    /// A failure that fails the operation it is recorded on.
    pub fn fatal(
        code: SyncErrorCode,
        message: impl Into<String>,
        material_id: Option<RecordId>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            material_id,
            recoverable: false,
        }
    }
}
