//! In-memory reference implementation of [`MaterialStore`].
//!
//! Backs the integration test suites and serves embedders that do not bring
//! their own persistence. State lives behind a single `tokio::sync::RwLock`
//! so interleaved async calls never observe a half-updated view. Per-method
//! call counters are exposed for tests that assert "no store call was made".

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use matsync_core::builder::append_note_block;
use matsync_core::model::{
    DispatchMaterial, DispatchMaterialPatch, DispatchNote, MaterialSource, MaterialStock,
    NewMaterialStock, NewProjectMaterial, NewStockTransaction, Project, ProjectMaterial,
    ProjectMaterialPatch, StockTransaction,
};
use matsync_core::types::RecordId;
use matsync_core::{CoreError, Result};

use crate::store::MaterialStore;
use async_trait::async_trait;

#[derive(Default)]
struct Inner {
    projects: HashMap<RecordId, Project>,
    project_materials: HashMap<RecordId, ProjectMaterial>,
    dispatch_notes: HashMap<RecordId, DispatchNote>,
    stock: HashMap<RecordId, MaterialStock>,
    transactions: Vec<StockTransaction>,
}

/// Per-method call counters, readable without locking.
#[derive(Default)]
struct Counters {
    total: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
}

/// In-memory [`MaterialStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    counters: Counters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint_id() -> RecordId {
        Uuid::now_v7().to_string()
    }

    fn count(&self) {
        self.counters.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Total store calls made so far.
    pub fn call_count(&self) -> u64 {
        self.counters.total.load(Ordering::Relaxed)
    }

    /// Number of `create_project_material` calls.
    pub fn project_material_creates(&self) -> u64 {
        self.counters.creates.load(Ordering::Relaxed)
    }

    /// Number of `update_project_material` calls.
    pub fn project_material_updates(&self) -> u64 {
        self.counters.updates.load(Ordering::Relaxed)
    }

    // -- seeding helpers ----------------------------------------------------

    pub async fn insert_project(&self, project: Project) {
        self.inner
            .write()
            .await
            .projects
            .insert(project.id.clone(), project);
    }

    pub async fn insert_dispatch_note(&self, note: DispatchNote) {
        self.inner
            .write()
            .await
            .dispatch_notes
            .insert(note.id.clone(), note);
    }

    pub async fn insert_project_material(&self, material: ProjectMaterial) {
        self.inner
            .write()
            .await
            .project_materials
            .insert(material.id.clone(), material);
    }

    pub async fn insert_stock(&self, stock: MaterialStock) {
        self.inner.write().await.stock.insert(stock.id.clone(), stock);
    }

    // -- inspection helpers -------------------------------------------------

    pub async fn project_material(&self, id: &str) -> Option<ProjectMaterial> {
        self.inner.read().await.project_materials.get(id).cloned()
    }

    pub async fn all_project_materials(&self, project_id: &str) -> Vec<ProjectMaterial> {
        self.inner
            .read()
            .await
            .project_materials
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect()
    }

    pub async fn transactions(&self) -> Vec<StockTransaction> {
        self.inner.read().await.transactions.clone()
    }
}

#[async_trait]
impl MaterialStore for MemoryStore {
    async fn project_materials_by_source(
        &self,
        project_id: &str,
        source: MaterialSource,
        source_id: Option<&str>,
    ) -> Result<Vec<ProjectMaterial>> {
        self.count();
        let inner = self.inner.read().await;
        Ok(inner
            .project_materials
            .values()
            .filter(|m| {
                m.project_id == project_id
                    && m.source == source
                    && source_id.is_none_or(|sid| m.source_id.as_deref() == Some(sid))
            })
            .cloned()
            .collect())
    }

    async fn create_project_material(&self, data: NewProjectMaterial) -> Result<RecordId> {
        self.count();
        self.counters.creates.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let id = Self::mint_id();
        let material = ProjectMaterial {
            id: id.clone(),
            project_id: data.project_id,
            catalog_id: data.catalog_id,
            name: data.name,
            material_type: data.material_type,
            profile: data.profile,
            grade: data.grade,
            dimensions: data.dimensions,
            unit: data.unit,
            quantity: data.quantity,
            unit_weight_kg: data.unit_weight_kg,
            total_weight_kg: data.total_weight_kg,
            unit_cost: data.unit_cost,
            total_cost: data.total_cost,
            status: data.status,
            source: data.source,
            source_id: data.source_id,
            delivery_date: data.delivery_date,
            location: data.location,
            notes: data.notes,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .write()
            .await
            .project_materials
            .insert(id.clone(), material);
        Ok(id)
    }

    async fn update_project_material(
        &self,
        id: &str,
        patch: ProjectMaterialPatch,
    ) -> Result<ProjectMaterial> {
        self.count();
        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.write().await;
        let material = inner
            .project_materials
            .get_mut(id)
            .ok_or(CoreError::NotFound {
                entity: "ProjectMaterial",
                id: id.to_string(),
            })?;

        if let Some(quantity) = patch.quantity {
            material.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            material.unit = unit;
        }
        if let Some(w) = patch.unit_weight_kg {
            material.unit_weight_kg = Some(w);
        }
        if let Some(w) = patch.total_weight_kg {
            material.total_weight_kg = Some(w);
        }
        if let Some(c) = patch.unit_cost {
            material.unit_cost = Some(c);
        }
        if let Some(c) = patch.total_cost {
            material.total_cost = Some(c);
        }
        if let Some(status) = patch.status {
            material.status = status;
        }
        if let Some(d) = patch.delivery_date {
            material.delivery_date = Some(d);
        }
        if let Some(location) = patch.location {
            material.location = Some(location);
        }
        if let Some(block) = patch.append_notes {
            material.notes = Some(append_note_block(material.notes.as_deref(), &block));
        }
        material.updated_at = Utc::now();
        Ok(material.clone())
    }

    async fn dispatch_notes_by_project(&self, project_id: &str) -> Result<Vec<DispatchNote>> {
        self.count();
        let inner = self.inner.read().await;
        Ok(inner
            .dispatch_notes
            .values()
            .filter(|n| n.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn dispatch_material(&self, id: &str) -> Result<Option<DispatchMaterial>> {
        self.count();
        let inner = self.inner.read().await;
        Ok(inner
            .dispatch_notes
            .values()
            .flat_map(|n| n.materials.iter())
            .find(|m| m.id == id)
            .cloned())
    }

    async fn update_dispatch_material(
        &self,
        id: &str,
        patch: DispatchMaterialPatch,
    ) -> Result<DispatchMaterial> {
        self.count();
        let mut inner = self.inner.write().await;
        let material = inner
            .dispatch_notes
            .values_mut()
            .flat_map(|n| n.materials.iter_mut())
            .find(|m| m.id == id)
            .ok_or(CoreError::NotFound {
                entity: "DispatchMaterial",
                id: id.to_string(),
            })?;

        if let Some(status) = patch.status {
            material.status = status;
        }
        if let Some(location) = patch.location {
            material.location = Some(location);
        }
        if let Some(notes) = patch.notes {
            material.notes = Some(notes);
        }
        if let Some(block) = patch.append_notes {
            material.notes = Some(append_note_block(material.notes.as_deref(), &block));
        }
        if let Some(usage) = patch.record_usage {
            material.usage.push(usage);
        }
        material.updated_at = Utc::now();
        Ok(material.clone())
    }

    async fn material_stock_by_material_id(&self, key: &str) -> Result<Option<MaterialStock>> {
        self.count();
        Ok(self.inner.read().await.stock.get(key).cloned())
    }

    async fn material_stock_by_project(&self, project_id: &str) -> Result<Vec<MaterialStock>> {
        self.count();
        let inner = self.inner.read().await;
        Ok(inner
            .stock
            .values()
            .filter(|s| s.project_id.as_deref() == Some(project_id))
            .cloned()
            .collect())
    }

    async fn create_material_stock(&self, entry: NewMaterialStock) -> Result<RecordId> {
        self.count();
        let id = entry.id.unwrap_or_else(Self::mint_id);
        let stock = MaterialStock {
            id: id.clone(),
            project_id: entry.project_id,
            total_stock: entry.total_stock,
            reserved_stock: entry.reserved_stock,
            available_stock: entry.available_stock,
            unit_price: entry.unit_price,
            location: entry.location,
            updated_at: Utc::now(),
        };
        self.inner.write().await.stock.insert(id.clone(), stock);
        Ok(id)
    }

    async fn create_stock_transaction(&self, entry: NewStockTransaction) -> Result<RecordId> {
        self.count();
        let id = Self::mint_id();
        let transaction = StockTransaction {
            id: id.clone(),
            stock_id: entry.stock_id,
            kind: entry.kind,
            quantity: entry.quantity,
            project_id: entry.project_id,
            reference_id: entry.reference_id,
            notes: entry.notes,
            created_at: Utc::now(),
        };
        self.inner.write().await.transactions.push(transaction);
        Ok(id)
    }

    async fn reserve_material_stock(
        &self,
        key: &str,
        quantity: f64,
        project_id: &str,
    ) -> Result<()> {
        self.count();
        let mut inner = self.inner.write().await;
        let stock = inner.stock.get_mut(key).ok_or(CoreError::NotFound {
            entity: "MaterialStock",
            id: key.to_string(),
        })?;
        if stock.available_stock < quantity {
            return Err(CoreError::Validation(format!(
                "cannot reserve {quantity} of {key}: only {} available",
                stock.available_stock
            )));
        }
        stock.available_stock -= quantity;
        stock.reserved_stock += quantity;
        stock.project_id = Some(project_id.to_string());
        stock.updated_at = Utc::now();
        Ok(())
    }

    async fn unreserve_material_stock(
        &self,
        key: &str,
        quantity: f64,
        _project_id: &str,
    ) -> Result<()> {
        self.count();
        let mut inner = self.inner.write().await;
        let stock = inner.stock.get_mut(key).ok_or(CoreError::NotFound {
            entity: "MaterialStock",
            id: key.to_string(),
        })?;
        if stock.reserved_stock < quantity {
            return Err(CoreError::Validation(format!(
                "cannot unreserve {quantity} of {key}: only {} reserved",
                stock.reserved_stock
            )));
        }
        stock.reserved_stock -= quantity;
        stock.available_stock += quantity;
        stock.updated_at = Utc::now();
        Ok(())
    }

    async fn project(&self, id: &str) -> Result<Option<Project>> {
        self.count();
        Ok(self.inner.read().await.projects.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use matsync_core::status::{DispatchMaterialStatus, ProjectMaterialStatus};

    use super::*;

    fn new_material(project_id: &str, source_id: &str) -> NewProjectMaterial {
        NewProjectMaterial {
            project_id: project_id.into(),
            catalog_id: None,
            name: "Beam S355JR".into(),
            material_type: "Beam".into(),
            profile: "IPE 300".into(),
            grade: "S355JR".into(),
            dimensions: HashMap::new(),
            unit: "pcs".into(),
            quantity: 20.0,
            unit_weight_kg: None,
            total_weight_kg: None,
            unit_cost: None,
            total_cost: None,
            status: ProjectMaterialStatus::Delivered,
            source: MaterialSource::Dispatch,
            source_id: Some(source_id.into()),
            delivery_date: None,
            location: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_then_fetch_by_source() {
        let store = MemoryStore::new();
        store
            .create_project_material(new_material("proj-1", "dm-1"))
            .await
            .unwrap();

        let by_note = store
            .project_materials_by_source("proj-1", MaterialSource::Dispatch, Some("dm-1"))
            .await
            .unwrap();
        assert_eq!(by_note.len(), 1);

        let other = store
            .project_materials_by_source("proj-1", MaterialSource::Dispatch, Some("dm-2"))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_project_material("missing", ProjectMaterialPatch::default())
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
    }

    #[tokio::test]
    async fn patch_appends_notes_without_overwriting() {
        let store = MemoryStore::new();
        let mut data = new_material("proj-1", "dm-1");
        data.notes = Some("user text".into());
        let id = store.create_project_material(data).await.unwrap();

        let updated = store
            .update_project_material(
                &id,
                ProjectMaterialPatch {
                    append_notes: Some("Dispatch Update: 20 pcs".into()),
                    ..ProjectMaterialPatch::default()
                },
            )
            .await
            .unwrap();
        let notes = updated.notes.unwrap();
        assert!(notes.starts_with("user text"));
        assert!(notes.contains("Dispatch Update"));
    }

    #[tokio::test]
    async fn reserve_moves_available_to_reserved() {
        let store = MemoryStore::new();
        store
            .create_material_stock(NewMaterialStock {
                id: Some("stock-1".into()),
                project_id: None,
                total_stock: 50.0,
                reserved_stock: 0.0,
                available_stock: 50.0,
                unit_price: None,
                location: None,
            })
            .await
            .unwrap();

        store
            .reserve_material_stock("stock-1", 20.0, "proj-1")
            .await
            .unwrap();
        let stock = store
            .material_stock_by_material_id("stock-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.reserved_stock, 20.0);
        assert_eq!(stock.available_stock, 30.0);
        assert_eq!(stock.project_id.as_deref(), Some("proj-1"));
    }

    #[tokio::test]
    async fn over_reserving_fails() {
        let store = MemoryStore::new();
        store
            .create_material_stock(NewMaterialStock {
                id: Some("stock-1".into()),
                project_id: None,
                total_stock: 10.0,
                reserved_stock: 0.0,
                available_stock: 10.0,
                unit_price: None,
                location: None,
            })
            .await
            .unwrap();
        let err = store
            .reserve_material_stock("stock-1", 15.0, "proj-1")
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn unreserve_without_reservation_fails() {
        let store = MemoryStore::new();
        store
            .create_material_stock(NewMaterialStock {
                id: Some("stock-1".into()),
                project_id: None,
                total_stock: 10.0,
                reserved_stock: 5.0,
                available_stock: 5.0,
                unit_price: None,
                location: None,
            })
            .await
            .unwrap();
        let err = store
            .unreserve_material_stock("stock-1", 8.0, "proj-1")
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn dispatch_material_lookup_spans_notes() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_dispatch_note(DispatchNote {
                id: "dn-1".into(),
                project_id: "proj-1".into(),
                dispatch_number: "DN-1".into(),
                supplier: None,
                expected_delivery_date: None,
                actual_delivery_date: None,
                tracking_number: None,
                inspection_notes: None,
                materials: vec![DispatchMaterial {
                    id: "dm-1".into(),
                    dispatch_note_id: "dn-1".into(),
                    material_type: "Beam".into(),
                    profile: "IPE 300".into(),
                    grade: "S355JR".into(),
                    dimensions: HashMap::new(),
                    unit: "pcs".into(),
                    quantity: 20.0,
                    delivered_quantity: 20.0,
                    ordered_quantity: 20.0,
                    unit_weight_kg: None,
                    total_weight_kg: None,
                    unit_cost: None,
                    status: DispatchMaterialStatus::Arrived,
                    location: None,
                    notes: None,
                    usage: Vec::new(),
                    created_at: now,
                    updated_at: now,
                }],
                created_at: now,
                updated_at: now,
            })
            .await;

        let found = store.dispatch_material("dm-1").await.unwrap();
        assert!(found.is_some());

        let updated = store
            .update_dispatch_material(
                "dm-1",
                DispatchMaterialPatch {
                    status: Some(DispatchMaterialStatus::Used),
                    ..DispatchMaterialPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, DispatchMaterialStatus::Used);
    }

    #[tokio::test]
    async fn projects_and_notes_are_queryable() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_project(Project {
                id: "proj-1".into(),
                name: "Riverside warehouse".into(),
                created_at: now,
            })
            .await;
        store
            .insert_dispatch_note(DispatchNote {
                id: "dn-1".into(),
                project_id: "proj-1".into(),
                dispatch_number: "DN-1".into(),
                supplier: None,
                expected_delivery_date: None,
                actual_delivery_date: None,
                tracking_number: None,
                inspection_notes: None,
                materials: Vec::new(),
                created_at: now,
                updated_at: now,
            })
            .await;

        assert!(store.project("proj-1").await.unwrap().is_some());
        assert!(store.project("proj-2").await.unwrap().is_none());
        assert_eq!(store.dispatch_notes_by_project("proj-1").await.unwrap().len(), 1);
        assert!(store.dispatch_notes_by_project("proj-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn call_counters_track_operations() {
        let store = MemoryStore::new();
        assert_eq!(store.call_count(), 0);
        store
            .create_project_material(new_material("proj-1", "dm-1"))
            .await
            .unwrap();
        assert_eq!(store.call_count(), 1);
        assert_eq!(store.project_material_creates(), 1);
        assert_eq!(store.project_material_updates(), 0);
    }
}
