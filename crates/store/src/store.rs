//! The `MaterialStore` trait: CRUD access to dispatch notes/materials,
//! project materials, and stock records.
//!
//! Implementations hold no business rules; every decision about what to
//! write lives in the sync engine. All methods are suspension points, and
//! the engine's advisory lock is logical only -- implementations must not
//! assume exclusivity over the underlying storage.

use async_trait::async_trait;
use matsync_core::model::{
    DispatchMaterial, DispatchMaterialPatch, DispatchNote, MaterialStock, NewMaterialStock,
    NewProjectMaterial, NewStockTransaction, Project, ProjectMaterial, ProjectMaterialPatch,
};
use matsync_core::model::MaterialSource;
use matsync_core::types::RecordId;
use matsync_core::Result;

/// CRUD store for the record sets the sync engine reconciles.
#[async_trait]
pub trait MaterialStore: Send + Sync {
    // -- project materials --------------------------------------------------

    /// Project materials with the given provenance. `source_id = None`
    /// returns every material of that source; `Some(id)` narrows to records
    /// produced by that exact upstream record.
    async fn project_materials_by_source(
        &self,
        project_id: &str,
        source: MaterialSource,
        source_id: Option<&str>,
    ) -> Result<Vec<ProjectMaterial>>;

    /// Insert a new project material, returning its id.
    async fn create_project_material(&self, data: NewProjectMaterial) -> Result<RecordId>;

    /// Apply a patch to a project material. Errors with `NotFound` when the
    /// id is unknown.
    async fn update_project_material(
        &self,
        id: &str,
        patch: ProjectMaterialPatch,
    ) -> Result<ProjectMaterial>;

    // -- dispatch records ---------------------------------------------------

    /// All dispatch notes recorded for a project.
    async fn dispatch_notes_by_project(&self, project_id: &str) -> Result<Vec<DispatchNote>>;

    /// One dispatch material by id.
    async fn dispatch_material(&self, id: &str) -> Result<Option<DispatchMaterial>>;

    /// Apply a patch to a dispatch material. Errors with `NotFound` when
    /// the id is unknown.
    async fn update_dispatch_material(
        &self,
        id: &str,
        patch: DispatchMaterialPatch,
    ) -> Result<DispatchMaterial>;

    // -- stock --------------------------------------------------------------

    /// Stock record by its material key (e.g. `dispatch-{materialId}`).
    async fn material_stock_by_material_id(&self, key: &str) -> Result<Option<MaterialStock>>;

    /// Stock records earmarked for a project.
    async fn material_stock_by_project(&self, project_id: &str) -> Result<Vec<MaterialStock>>;

    /// Insert a stock record, returning its id.
    async fn create_material_stock(&self, entry: NewMaterialStock) -> Result<RecordId>;

    /// Append a stock transaction log entry.
    async fn create_stock_transaction(&self, entry: NewStockTransaction) -> Result<RecordId>;

    /// Move `quantity` from available to reserved for `project_id`.
    /// Errors when the stock record is missing or has too little available.
    async fn reserve_material_stock(
        &self,
        key: &str,
        quantity: f64,
        project_id: &str,
    ) -> Result<()>;

    /// Release `quantity` of reserved stock. Errors when the stock record
    /// is missing or has too little reserved.
    async fn unreserve_material_stock(
        &self,
        key: &str,
        quantity: f64,
        project_id: &str,
    ) -> Result<()>;

    // -- projects -----------------------------------------------------------

    /// Project lookup. Consumed by the external budgeting helper, not by
    /// the sync engine itself.
    async fn project(&self, id: &str) -> Result<Option<Project>>;
}
