//! Project and project material entities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::status::ProjectMaterialStatus;
use crate::types::{RecordId, Timestamp};

/// A fabrication project. Only the fields the sync engine and the external
/// budgeting helper read; project management lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    pub created_at: Timestamp,
}

/// Provenance of a project material record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialSource {
    Manual,
    Calculation,
    Dispatch,
    Template,
}

/// A project's tracked material instance.
///
/// Invariant: `source == Dispatch` implies a non-empty `source_id`
/// referencing exactly one dispatch material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMaterial {
    pub id: RecordId,
    pub project_id: RecordId,
    /// Optional link into the static material catalog.
    pub catalog_id: Option<RecordId>,
    pub name: String,
    pub material_type: String,
    pub profile: String,
    pub grade: String,
    pub dimensions: HashMap<String, f64>,
    pub unit: String,
    pub quantity: f64,
    pub unit_weight_kg: Option<f64>,
    pub total_weight_kg: Option<f64>,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub status: ProjectMaterialStatus,
    pub source: MaterialSource,
    pub source_id: Option<RecordId>,
    pub delivery_date: Option<Timestamp>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProjectMaterial {
    /// True when this record was produced by the sync engine from a
    /// dispatch material.
    pub fn is_dispatch_sourced(&self) -> bool {
        self.source == MaterialSource::Dispatch
            && self.source_id.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// DTO for creating a new project material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProjectMaterial {
    pub project_id: RecordId,
    pub catalog_id: Option<RecordId>,
    pub name: String,
    pub material_type: String,
    pub profile: String,
    pub grade: String,
    pub dimensions: HashMap<String, f64>,
    pub unit: String,
    pub quantity: f64,
    pub unit_weight_kg: Option<f64>,
    pub total_weight_kg: Option<f64>,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub status: ProjectMaterialStatus,
    pub source: MaterialSource,
    pub source_id: Option<RecordId>,
    pub delivery_date: Option<Timestamp>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Typed patch for a project material. Only `Some` fields are applied.
///
/// Notes are append-only from the sync engine's side: `append_notes` is
/// concatenated onto the existing notes, never replacing user text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMaterialPatch {
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_weight_kg: Option<f64>,
    pub total_weight_kg: Option<f64>,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub status: Option<ProjectMaterialStatus>,
    pub delivery_date: Option<Timestamp>,
    pub location: Option<String>,
    pub append_notes: Option<String>,
}

impl ProjectMaterialPatch {
    /// True when applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.unit.is_none()
            && self.unit_weight_kg.is_none()
            && self.total_weight_kg.is_none()
            && self.unit_cost.is_none()
            && self.total_cost.is_none()
            && self.status.is_none()
            && self.delivery_date.is_none()
            && self.location.is_none()
            && self.append_notes.is_none()
    }
}
