//! Shared fixtures and test doubles for the integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use matsync_core::model::{
    DispatchMaterial, DispatchMaterialPatch, DispatchNote, MaterialSource, MaterialStock,
    NewMaterialStock, NewProjectMaterial, NewStockTransaction, Project, ProjectMaterial,
    ProjectMaterialPatch,
};
use matsync_core::status::{DispatchMaterialStatus, ProjectMaterialStatus};
use matsync_core::types::RecordId;
use matsync_core::{CoreError, Result};
use matsync_store::{MaterialStore, MemoryStore};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn dispatch_material(
    id: &str,
    note_id: &str,
    status: DispatchMaterialStatus,
    quantity: f64,
) -> DispatchMaterial {
    let now = Utc::now();
    DispatchMaterial {
        id: id.into(),
        dispatch_note_id: note_id.into(),
        material_type: "Beam".into(),
        profile: "IPE 300".into(),
        grade: "S355JR".into(),
        dimensions: HashMap::from([("length".to_string(), 12000.0)]),
        unit: "pcs".into(),
        quantity,
        delivered_quantity: quantity,
        ordered_quantity: quantity,
        unit_weight_kg: Some(42.2),
        total_weight_kg: Some(42.2 * quantity),
        unit_cost: Some(310.0),
        status,
        location: Some("Yard A".into()),
        notes: None,
        usage: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn dispatch_note(
    id: &str,
    project_id: &str,
    materials: Vec<DispatchMaterial>,
) -> DispatchNote {
    let now = Utc::now();
    DispatchNote {
        id: id.into(),
        project_id: project_id.into(),
        dispatch_number: format!("DN-{id}"),
        supplier: Some("SteelCo".into()),
        expected_delivery_date: None,
        actual_delivery_date: Some(now),
        tracking_number: Some("TRK-99".into()),
        inspection_notes: None,
        materials,
        created_at: now,
        updated_at: now,
    }
}

/// A dispatch-sourced project material whose `updated_at` is old enough to
/// stay outside the default conflict window.
pub fn project_material(
    id: &str,
    project_id: &str,
    source_id: &str,
    status: ProjectMaterialStatus,
) -> ProjectMaterial {
    let stale = Utc::now() - ChronoDuration::hours(2);
    ProjectMaterial {
        id: id.into(),
        project_id: project_id.into(),
        catalog_id: None,
        name: "Beam S355JR".into(),
        material_type: "Beam".into(),
        profile: "IPE 300".into(),
        grade: "S355JR".into(),
        dimensions: HashMap::from([("length".to_string(), 12000.0)]),
        unit: "pcs".into(),
        quantity: 20.0,
        unit_weight_kg: Some(42.2),
        total_weight_kg: Some(844.0),
        unit_cost: None,
        total_cost: None,
        status,
        source: MaterialSource::Dispatch,
        source_id: Some(source_id.into()),
        delivery_date: None,
        location: None,
        notes: None,
        created_at: stale,
        updated_at: stale,
    }
}

pub fn reserved_stock(material_id: &str, project_id: &str, quantity: f64) -> MaterialStock {
    MaterialStock {
        id: format!("dispatch-{material_id}"),
        project_id: Some(project_id.into()),
        total_stock: quantity,
        reserved_stock: quantity,
        available_stock: 0.0,
        unit_price: Some(310.0),
        location: None,
        updated_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// TestStore: a MemoryStore wrapper with injectable latency and failures
// ---------------------------------------------------------------------------

/// Delegating store double. `fetch_delay` stretches the first fetch of a
/// dispatch-to-project sync (to force lock contention in concurrent tests);
/// `fail_dispatch_updates` makes the next N dispatch-material updates fail.
pub struct TestStore {
    pub inner: Arc<MemoryStore>,
    pub fetch_delay: Duration,
    pub fail_dispatch_updates: AtomicU32,
}

impl TestStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fetch_delay: Duration::ZERO,
            fail_dispatch_updates: AtomicU32::new(0),
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn fail_next_dispatch_updates(&self, count: u32) {
        self.fail_dispatch_updates.store(count, Ordering::SeqCst);
    }

    fn take_dispatch_update_failure(&self) -> bool {
        self.fail_dispatch_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MaterialStore for TestStore {
    async fn project_materials_by_source(
        &self,
        project_id: &str,
        source: MaterialSource,
        source_id: Option<&str>,
    ) -> Result<Vec<ProjectMaterial>> {
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.inner
            .project_materials_by_source(project_id, source, source_id)
            .await
    }

    async fn create_project_material(&self, data: NewProjectMaterial) -> Result<RecordId> {
        self.inner.create_project_material(data).await
    }

    async fn update_project_material(
        &self,
        id: &str,
        patch: ProjectMaterialPatch,
    ) -> Result<ProjectMaterial> {
        self.inner.update_project_material(id, patch).await
    }

    async fn dispatch_notes_by_project(&self, project_id: &str) -> Result<Vec<DispatchNote>> {
        self.inner.dispatch_notes_by_project(project_id).await
    }

    async fn dispatch_material(&self, id: &str) -> Result<Option<DispatchMaterial>> {
        self.inner.dispatch_material(id).await
    }

    async fn update_dispatch_material(
        &self,
        id: &str,
        patch: DispatchMaterialPatch,
    ) -> Result<DispatchMaterial> {
        if self.take_dispatch_update_failure() {
            return Err(CoreError::Internal("injected dispatch update failure".into()));
        }
        self.inner.update_dispatch_material(id, patch).await
    }

    async fn material_stock_by_material_id(&self, key: &str) -> Result<Option<MaterialStock>> {
        self.inner.material_stock_by_material_id(key).await
    }

    async fn material_stock_by_project(&self, project_id: &str) -> Result<Vec<MaterialStock>> {
        self.inner.material_stock_by_project(project_id).await
    }

    async fn create_material_stock(&self, entry: NewMaterialStock) -> Result<RecordId> {
        self.inner.create_material_stock(entry).await
    }

    async fn create_stock_transaction(&self, entry: NewStockTransaction) -> Result<RecordId> {
        self.inner.create_stock_transaction(entry).await
    }

    async fn reserve_material_stock(
        &self,
        key: &str,
        quantity: f64,
        project_id: &str,
    ) -> Result<()> {
        self.inner.reserve_material_stock(key, quantity, project_id).await
    }

    async fn unreserve_material_stock(
        &self,
        key: &str,
        quantity: f64,
        project_id: &str,
    ) -> Result<()> {
        self.inner
            .unreserve_material_stock(key, quantity, project_id)
            .await
    }

    async fn project(&self, id: &str) -> Result<Option<Project>> {
        self.inner.project(id).await
    }
}
