//! Bidirectional material synchronization engine.
//!
//! Reconciles supplier dispatch records with project material tracking
//! records: dispatch-to-project creates/updates tracked materials with
//! stock-reservation side effects, project-to-dispatch forwards installation
//! progress back to the shipment records. Advisory locking serializes
//! operations on the same (project, dispatch, material set) scope;
//! per-material failures are isolated so one bad record never aborts a
//! batch.
//!
//! Known limitation, by contract: rollback of a failed batch is advisory
//! only. Partial writes are flagged on the result and logged, not reversed;
//! only the single-material transactional wrapper applies a compensating
//! update.

pub mod config;
pub mod error;
pub mod history;
pub mod lock;
pub mod options;
pub mod result;
pub mod service;
pub mod stock;

pub use config::SyncConfig;
pub use error::{SyncError, SyncErrorCode};
pub use options::{BatchSyncOptions, SyncOptions, TransactionSyncOptions};
pub use result::{BatchFailure, BatchSyncResult, SyncOperationKind, SyncOperationResult};
pub use service::SyncService;
pub use stock::{ReservedMaterial, ReservedSummary};
