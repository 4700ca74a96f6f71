//! The sync orchestrator.
//!
//! Composes the lock manager, validator, conflict resolver, payload
//! builders, and stock coordinator into the two sync directions plus their
//! batch and transactional variants. One instance owns its lock table,
//! history, and event plumbing; nothing here is process-global.
//!
//! Rollback is advisory: when a dispatch-to-project operation fails
//! mid-batch, partial writes are flagged (`rollback_required`) and logged,
//! not reversed. The transactional project-to-dispatch wrapper goes one step
//! further and applies a compensating update from a pre-sync snapshot, which
//! restores status/location/notes but does not remove appended usage
//! entries.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;
use validator::Validate;

use matsync_core::builder::{build_new_material, build_update_patch};
use matsync_core::conflict::{detect_conflict, resolve, ConflictDecision, MergePolicy};
use matsync_core::model::{
    DispatchMaterial, DispatchMaterialPatch, DispatchNote, MaterialSource, ProjectMaterial,
    UsageEntry,
};
use matsync_core::status::{guarded_dispatch_status, to_dispatch_status, DispatchMaterialStatus,
    ProjectMaterialStatus};
use matsync_core::validate::{check_compatibility, has_blocking_issue};
use matsync_core::{CoreError, Result};
use matsync_events::{EventBus, ListenerId, ListenerRegistry, SyncEvent, SyncEventKind};
use matsync_store::MaterialStore;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncErrorCode};
use crate::history::SyncHistory;
use crate::lock::LockManager;
use crate::options::{BatchSyncOptions, SyncOptions, TransactionSyncOptions};
use crate::result::{BatchFailure, BatchSyncResult, SyncOperationKind, SyncOperationResult};
use crate::stock::{ReservedSummary, StockCoordinator};

/// Bidirectional material synchronization service.
///
/// Cheap to share as `Arc<SyncService<_>>`; all state is behind async
/// primitives and operations on disjoint lock scopes run concurrently.
pub struct SyncService<S> {
    store: Arc<S>,
    config: SyncConfig,
    locks: LockManager,
    history: SyncHistory,
    bus: EventBus,
    listeners: ListenerRegistry,
    stock: StockCoordinator<S>,
}

impl<S: MaterialStore> SyncService<S> {
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            locks: LockManager::new(config.lock_ttl()),
            history: SyncHistory::new(config.history_limit),
            bus: EventBus::default(),
            listeners: ListenerRegistry::new(),
            stock: StockCoordinator::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    /// Convenience constructor with [`SyncConfig::default`].
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, SyncConfig::default())
    }

    /// Sync options seeded from this instance's configuration.
    pub fn default_options(&self) -> SyncOptions {
        let mut options = SyncOptions::default();
        options.match_criteria.tolerance_percent = self.config.default_tolerance_percent;
        options
    }

    // -- events & history ---------------------------------------------------

    /// Receive every sync lifecycle event on a broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.bus.subscribe()
    }

    /// Register a synchronous event listener.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.listeners.add(listener)
    }

    /// Remove a listener. Idempotent.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Recent operation results, newest first.
    pub async fn history(&self, limit: Option<usize>) -> Vec<SyncOperationResult> {
        self.history.recent(limit).await
    }

    /// Live advisory locks held right now.
    pub async fn active_lock_count(&self) -> usize {
        self.locks.active_count().await
    }

    // -- stock passthroughs -------------------------------------------------

    /// Total reserved quantity for a project plus a per-material breakdown.
    pub async fn project_reserved_materials(&self, project_id: &str) -> Result<ReservedSummary> {
        self.stock.project_reserved_materials(project_id).await
    }

    /// Manually earmark catalog stock for a project. Returns `false` rather
    /// than erroring when the reservation cannot be made.
    pub async fn reserve_stock_for_project(
        &self,
        material_catalog_id: &str,
        quantity: f64,
        project_id: &str,
        notes: Option<String>,
    ) -> bool {
        self.stock
            .reserve_for_project(material_catalog_id, quantity, project_id, notes)
            .await
    }

    // -- dispatch -> project ------------------------------------------------

    /// Reconcile one dispatch note into a project's material records.
    ///
    /// Materials are processed independently in input order: a blocking
    /// validation finding or a failed store write skips/fails that one
    /// material and the loop continues. The call itself only errors on
    /// malformed input (e.g. an out-of-range tolerance); every operational
    /// failure is recorded on the returned result instead.
    pub async fn sync_dispatch_to_project(
        &self,
        project_id: &str,
        note: &DispatchNote,
        options: SyncOptions,
    ) -> Result<SyncOperationResult> {
        options.match_criteria.validate().map_err(CoreError::from)?;

        let operation_id = Uuid::now_v7().to_string();
        let mut result = SyncOperationResult::new(
            SyncOperationKind::DispatchToProject,
            operation_id.clone(),
            project_id,
            Utc::now(),
        );
        let material_ids = note.material_ids();

        if !self
            .locks
            .acquire(
                &operation_id,
                SyncOperationKind::DispatchToProject,
                project_id,
                &material_ids,
                Some(note.id.as_str()),
            )
            .await
        {
            result.record_error(SyncError::fatal(
                SyncErrorCode::LockAcquisitionFailed,
                format!("Cannot acquire lock for project {project_id}, dispatch {}", note.id),
                None,
            ));
            return Ok(self.finish(result).await);
        }
        self.emit_started(&result);

        if let Err(e) = self
            .run_dispatch_loop(project_id, note, &options, &mut result)
            .await
        {
            tracing::error!(
                operation_id = %result.operation_id,
                error = %e,
                "Dispatch sync aborted",
            );
            result.record_error(SyncError::fatal(
                SyncErrorCode::SyncOperationFailed,
                format!("dispatch sync failed: {e}"),
                None,
            ));
            result.rollback_required = true;
            self.log_advisory_rollback(&result);
        }

        self.locks
            .release(project_id, &material_ids, Some(note.id.as_str()))
            .await;
        Ok(self.finish(result).await)
    }

    /// Fetch existing records once, then walk the note's materials.
    async fn run_dispatch_loop(
        &self,
        project_id: &str,
        note: &DispatchNote,
        options: &SyncOptions,
        result: &mut SyncOperationResult,
    ) -> Result<()> {
        let existing = self
            .store
            .project_materials_by_source(project_id, MaterialSource::Dispatch, None)
            .await?;
        let by_source: HashMap<&str, &ProjectMaterial> = existing
            .iter()
            .filter_map(|m| m.source_id.as_deref().map(|sid| (sid, m)))
            .collect();

        for material in &note.materials {
            let counterpart = by_source.get(material.id.as_str()).copied();
            self.sync_one_dispatch_material(project_id, note, material, counterpart, options, result)
                .await;
        }
        Ok(())
    }

    /// Process one dispatch material. Never propagates store failures; they
    /// are recorded on the result with this material's id.
    async fn sync_one_dispatch_material(
        &self,
        project_id: &str,
        note: &DispatchNote,
        material: &DispatchMaterial,
        counterpart: Option<&ProjectMaterial>,
        options: &SyncOptions,
        result: &mut SyncOperationResult,
    ) {
        match counterpart {
            Some(existing) => {
                if !options.update_existing {
                    tracing::debug!(material_id = %material.id, "Updates disabled; skipping");
                    result.skipped += 1;
                    return;
                }

                let issues = check_compatibility(material, existing, &options.match_criteria);
                let blocking = has_blocking_issue(&issues);
                result.validation_issues.extend(issues);
                if blocking {
                    tracing::debug!(
                        material_id = %material.id,
                        "Specification mismatch; material skipped",
                    );
                    result.skipped += 1;
                    return;
                }

                let now = Utc::now();
                let policy = if detect_conflict(existing.updated_at, now, self.config.conflict_window())
                {
                    result.conflicts_detected += 1;
                    match resolve(options.conflict_strategy) {
                        ConflictDecision::Refuse => {
                            tracing::warn!(
                                material_id = %material.id,
                                project_material_id = %existing.id,
                                "Concurrent update detected; flagged for manual review",
                            );
                            result.skipped += 1;
                            return;
                        }
                        ConflictDecision::Apply(policy) => {
                            result.conflicts_resolved += 1;
                            policy
                        }
                    }
                } else {
                    MergePolicy::Full
                };

                let patch =
                    build_update_patch(note, material, existing, options.sync_status, policy, now);
                let reached_installed = patch.status == Some(ProjectMaterialStatus::Installed);

                match self.store.update_project_material(&existing.id, patch).await {
                    Err(e) => {
                        tracing::warn!(material_id = %material.id, error = %e, "Update failed");
                        result.record_error(SyncError::recoverable(
                            SyncErrorCode::MaterialSyncFailed,
                            format!("update of {} failed: {e}", existing.id),
                            Some(material.id.clone()),
                        ));
                    }
                    Ok(_) => {
                        result.updated += 1;
                        result.processed += 1;
                        if reached_installed {
                            if let Err(e) = self
                                .stock
                                .release_for_usage(
                                    &material.id,
                                    material.effective_quantity(),
                                    project_id,
                                )
                                .await
                            {
                                result.record_error(e);
                            }
                        }
                    }
                }
            }
            None => {
                if !options.create_if_not_exists {
                    tracing::debug!(material_id = %material.id, "Creation disabled; skipping");
                    result.skipped += 1;
                    return;
                }

                let stock_price = self.stock.stock_price(&material.id).await;
                let new =
                    build_new_material(note, material, stock_price, options.sync_status, Utc::now());

                match self.store.create_project_material(new).await {
                    Err(e) => {
                        tracing::warn!(material_id = %material.id, error = %e, "Create failed");
                        result.record_error(SyncError::recoverable(
                            SyncErrorCode::MaterialSyncFailed,
                            format!("create for {} failed: {e}", material.id),
                            Some(material.id.clone()),
                        ));
                    }
                    Ok(project_material_id) => {
                        tracing::debug!(
                            material_id = %material.id,
                            project_material_id = %project_material_id,
                            "Project material created",
                        );
                        result.created += 1;
                        result.processed += 1;
                        if matches!(
                            material.status,
                            DispatchMaterialStatus::Arrived | DispatchMaterialStatus::Allocated
                        ) {
                            if let Err(e) =
                                self.stock.reserve_for_dispatch(material, project_id).await
                            {
                                result.record_error(e);
                            }
                        }
                    }
                }
            }
        }
    }

    // -- project -> dispatch ------------------------------------------------

    /// Forward a project material's state back to its dispatch record.
    ///
    /// A no-op success (counted as skipped) unless the material is
    /// dispatch-sourced. The inverse status map and the same regression
    /// guard prevent the two directions from oscillating.
    pub async fn sync_project_to_dispatch(
        &self,
        material: &ProjectMaterial,
        options: SyncOptions,
    ) -> Result<SyncOperationResult> {
        options.match_criteria.validate().map_err(CoreError::from)?;
        let result = self.run_project_to_dispatch(material, &options).await;
        Ok(self.finish(result).await)
    }

    /// Sequentially sync a set of project materials back to dispatch.
    ///
    /// Empty input returns an all-zero result without taking a lock or
    /// touching the store. With `continue_on_error = false` (the default)
    /// the first failed item aborts the remainder.
    pub async fn batch_sync_project_to_dispatch(
        &self,
        materials: &[ProjectMaterial],
        options: BatchSyncOptions,
    ) -> Result<BatchSyncResult> {
        let mut batch = BatchSyncResult::default();
        if materials.is_empty() {
            return Ok(batch);
        }

        for material in materials {
            let result = self
                .sync_project_to_dispatch(material, options.sync.clone())
                .await?;
            batch.total_processed += 1;
            if result.success {
                batch.successful.push(material.id.clone());
            } else {
                let message = result
                    .errors
                    .iter()
                    .find(|e| !e.recoverable)
                    .or_else(|| result.errors.first())
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "sync failed".to_string());
                batch.failed.push(BatchFailure {
                    material_id: material.id.clone(),
                    message,
                });
                if !options.continue_on_error {
                    tracing::warn!(
                        material_id = %material.id,
                        "Batch aborted on first failure",
                    );
                    break;
                }
            }
        }
        Ok(batch)
    }

    /// Single forward sync wrapped with a compensating rollback.
    ///
    /// On failure with rollback enabled, the dispatch material is restored
    /// from a pre-sync snapshot; success clears `rollback_required`. A
    /// missing dispatch material is terminal regardless of the rollback
    /// setting.
    pub async fn sync_project_to_dispatch_with_transaction(
        &self,
        material: &ProjectMaterial,
        options: TransactionSyncOptions,
    ) -> Result<SyncOperationResult> {
        options.sync.match_criteria.validate().map_err(CoreError::from)?;

        let snapshot = match material.source_id.as_deref() {
            Some(source_id) if material.is_dispatch_sourced() => self
                .store
                .dispatch_material(source_id)
                .await
                .unwrap_or_default(),
            _ => None,
        };

        let mut result = self.run_project_to_dispatch(material, &options.sync).await;
        if !result.success {
            result.rollback_required = true;
            let not_found = result
                .errors
                .iter()
                .any(|e| e.code == SyncErrorCode::DispatchMaterialNotFound);

            if options.enable_rollback && !not_found {
                match snapshot {
                    Some(prior) => self.apply_compensating_update(&prior, &mut result).await,
                    None => {
                        result.record_error(SyncError::fatal(
                            SyncErrorCode::RollbackFailed,
                            "no pre-sync snapshot available for rollback",
                            material.source_id.clone(),
                        ));
                    }
                }
            }
        }
        Ok(self.finish(result).await)
    }

    /// Lock, map, guard, and write one project material back to dispatch.
    /// Returns an unfinished result; callers finalize/emit/record exactly
    /// once.
    async fn run_project_to_dispatch(
        &self,
        material: &ProjectMaterial,
        options: &SyncOptions,
    ) -> SyncOperationResult {
        let operation_id = Uuid::now_v7().to_string();
        let mut result = SyncOperationResult::new(
            SyncOperationKind::ProjectToDispatch,
            operation_id.clone(),
            material.project_id.clone(),
            Utc::now(),
        );

        if !material.is_dispatch_sourced() {
            tracing::debug!(
                material_id = %material.id,
                source = ?material.source,
                "Not dispatch-sourced; nothing to sync",
            );
            result.skipped += 1;
            return result;
        }
        let source_id = material
            .source_id
            .clone()
            .unwrap_or_default();
        let lock_ids = [source_id.clone()];

        if !self
            .locks
            .acquire(
                &operation_id,
                SyncOperationKind::ProjectToDispatch,
                &material.project_id,
                &lock_ids,
                None,
            )
            .await
        {
            result.record_error(SyncError::fatal(
                SyncErrorCode::LockAcquisitionFailed,
                format!(
                    "Cannot acquire lock for project {}, material {source_id}",
                    material.project_id
                ),
                Some(material.id.clone()),
            ));
            return result;
        }
        self.emit_started(&result);

        self.forward_to_dispatch(material, &source_id, options, &mut result)
            .await;

        self.locks
            .release(&material.project_id, &lock_ids, None)
            .await;
        result
    }

    async fn forward_to_dispatch(
        &self,
        material: &ProjectMaterial,
        source_id: &str,
        options: &SyncOptions,
        result: &mut SyncOperationResult,
    ) {
        let dispatch = match self.store.dispatch_material(source_id).await {
            Err(e) => {
                result.record_error(SyncError::fatal(
                    SyncErrorCode::SyncOperationFailed,
                    format!("dispatch lookup failed: {e}"),
                    Some(material.id.clone()),
                ));
                return;
            }
            Ok(None) => {
                result.record_error(SyncError::fatal(
                    SyncErrorCode::DispatchMaterialNotFound,
                    format!("dispatch material {source_id} not found"),
                    Some(material.id.clone()),
                ));
                return;
            }
            Ok(Some(dispatch)) => dispatch,
        };

        if !options.sync_status {
            tracing::debug!(material_id = %material.id, "Status sync disabled; skipping");
            result.skipped += 1;
            return;
        }

        let now = Utc::now();
        let candidate = to_dispatch_status(material.status);
        let Some(next) = guarded_dispatch_status(dispatch.status, candidate, false) else {
            tracing::debug!(
                material_id = %material.id,
                current = ?dispatch.status,
                candidate = ?candidate,
                "Regression guard held; dispatch status unchanged",
            );
            result.skipped += 1;
            return;
        };

        let mut patch = DispatchMaterialPatch {
            status: Some(next),
            append_notes: Some(format!(
                "Project Update: status {:?} applied from project tracking on {}.",
                next,
                now.format("%Y-%m-%d"),
            )),
            ..DispatchMaterialPatch::default()
        };
        if next == DispatchMaterialStatus::Used {
            patch.record_usage = Some(UsageEntry {
                project_material_id: material.id.clone(),
                quantity: material.quantity,
                used_at: now,
            });
        }

        match self.store.update_dispatch_material(source_id, patch).await {
            Err(e) => {
                tracing::warn!(material_id = %material.id, error = %e, "Dispatch update failed");
                result.record_error(SyncError::fatal(
                    SyncErrorCode::MaterialSyncFailed,
                    format!("update of dispatch material {source_id} failed: {e}"),
                    Some(material.id.clone()),
                ));
            }
            Ok(_) => {
                result.updated += 1;
                result.processed += 1;
                if next == DispatchMaterialStatus::Used {
                    if let Err(e) = self
                        .stock
                        .release_for_usage(
                            &dispatch.id,
                            dispatch.effective_quantity(),
                            &material.project_id,
                        )
                        .await
                    {
                        result.record_error(e);
                    }
                }
            }
        }
    }

    /// Restore a dispatch material from its pre-sync snapshot.
    async fn apply_compensating_update(
        &self,
        prior: &DispatchMaterial,
        result: &mut SyncOperationResult,
    ) {
        let restore = DispatchMaterialPatch {
            status: Some(prior.status),
            location: prior.location.clone(),
            notes: Some(prior.notes.clone().unwrap_or_default()),
            ..DispatchMaterialPatch::default()
        };
        match self.store.update_dispatch_material(&prior.id, restore).await {
            Ok(_) => {
                tracing::warn!(
                    dispatch_material_id = %prior.id,
                    "Compensating update applied; pre-sync state restored",
                );
                result.rollback_required = false;
                result.rollback_performed = true;
            }
            Err(e) => {
                tracing::error!(
                    dispatch_material_id = %prior.id,
                    error = %e,
                    "Compensating update failed",
                );
                result.record_error(SyncError::fatal(
                    SyncErrorCode::RollbackFailed,
                    format!("rollback of {} failed: {e}", prior.id),
                    Some(prior.id.clone()),
                ));
            }
        }
    }

    // -- plumbing -----------------------------------------------------------

    /// Advisory rollback for the batch direction: partial writes are
    /// flagged and logged, not reversed.
    fn log_advisory_rollback(&self, result: &SyncOperationResult) {
        tracing::warn!(
            operation_id = %result.operation_id,
            created = result.created,
            updated = result.updated,
            "Rollback requested; partial writes are left in place and flagged",
        );
    }

    fn emit_started(&self, result: &SyncOperationResult) {
        let event = SyncEvent::new(
            SyncEventKind::SyncStarted,
            result.operation_id.clone(),
            result.project_id.clone(),
        );
        self.listeners.emit(&event);
        self.bus.publish(event);
    }

    /// Finalize, emit the completion event, and append to history. Every
    /// public operation funnels through here exactly once.
    async fn finish(&self, mut result: SyncOperationResult) -> SyncOperationResult {
        result.finalize(Utc::now());
        if result.success {
            tracing::info!(
                operation_id = %result.operation_id,
                kind = result.kind.as_str(),
                processed = result.processed,
                created = result.created,
                updated = result.updated,
                skipped = result.skipped,
                "Sync completed",
            );
        } else {
            tracing::warn!(
                operation_id = %result.operation_id,
                kind = result.kind.as_str(),
                errors = result.errors.len(),
                "Sync failed",
            );
        }

        let payload = serde_json::to_value(&result).unwrap_or_default();
        let event = SyncEvent::new(
            SyncEventKind::SyncCompleted,
            result.operation_id.clone(),
            result.project_id.clone(),
        )
        .with_payload(payload);
        self.listeners.emit(&event);
        self.bus.publish(event);

        self.history.record(result.clone()).await;
        result
    }
}
