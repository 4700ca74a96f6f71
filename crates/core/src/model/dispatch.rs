//! Dispatch note and dispatch material entities.
//!
//! A dispatch note records one supplier shipment to a project; each of its
//! materials is one shipped line item with its own delivery/usage status.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::status::DispatchMaterialStatus;
use crate::types::{RecordId, Timestamp};

/// One supplier shipment to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchNote {
    pub id: RecordId,
    pub project_id: RecordId,
    /// Supplier-facing shipment number, e.g. `DN-2024-0131`.
    pub dispatch_number: String,
    pub supplier: Option<String>,
    pub expected_delivery_date: Option<Timestamp>,
    pub actual_delivery_date: Option<Timestamp>,
    pub tracking_number: Option<String>,
    pub inspection_notes: Option<String>,
    pub materials: Vec<DispatchMaterial>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DispatchNote {
    /// Ids of every material line item on this note.
    pub fn material_ids(&self) -> Vec<RecordId> {
        self.materials.iter().map(|m| m.id.clone()).collect()
    }
}

/// One shipped line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchMaterial {
    pub id: RecordId,
    pub dispatch_note_id: RecordId,
    /// Material family, e.g. `Beam`, `Plate`, `Bar`.
    pub material_type: String,
    /// Section profile, e.g. `IPE 300`, `Channel`.
    pub profile: String,
    /// Steel grade, e.g. `S355JR`.
    pub grade: String,
    /// Physical dimensions keyed by name (`length`, `width`, `thickness`, ...),
    /// values in project units.
    pub dimensions: HashMap<String, f64>,
    /// Unit of measure for the quantities below, e.g. `pcs`, `kg`.
    pub unit: String,
    pub quantity: f64,
    pub delivered_quantity: f64,
    pub ordered_quantity: f64,
    pub unit_weight_kg: Option<f64>,
    pub total_weight_kg: Option<f64>,
    pub unit_cost: Option<f64>,
    pub status: DispatchMaterialStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub usage: Vec<UsageEntry>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DispatchMaterial {
    /// The quantity a downstream reservation covers: delivered when known,
    /// the plain line quantity otherwise.
    pub fn effective_quantity(&self) -> f64 {
        if self.delivered_quantity > 0.0 {
            self.delivered_quantity
        } else {
            self.quantity
        }
    }
}

/// One recorded consumption of a dispatch material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEntry {
    pub project_material_id: RecordId,
    pub quantity: f64,
    pub used_at: Timestamp,
}

/// Typed patch for a dispatch material. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchMaterialPatch {
    pub status: Option<DispatchMaterialStatus>,
    pub location: Option<String>,
    /// Replaces the notes field wholesale. Used by compensating rollback
    /// writes; regular sync paths append via `append_notes`.
    pub notes: Option<String>,
    /// Appended to existing notes with a blank-line separator.
    pub append_notes: Option<String>,
    /// Appended to the usage history.
    pub record_usage: Option<UsageEntry>,
}

impl DispatchMaterialPatch {
    /// True when applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.location.is_none()
            && self.notes.is_none()
            && self.append_notes.is_none()
            && self.record_usage.is_none()
    }
}
