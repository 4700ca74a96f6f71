//! Builds the merged patch or new-record payload for one material.
//!
//! The update path only ever produces a typed patch listing the fields the
//! sync intends to change; the create path synthesizes a complete
//! dispatch-sourced project material with a structured provenance note.

use crate::conflict::MergePolicy;
use crate::model::{
    DispatchMaterial, DispatchNote, MaterialSource, NewProjectMaterial, ProjectMaterial,
    ProjectMaterialPatch,
};
use crate::status::{
    guarded_project_status, to_project_status, DispatchMaterialStatus, ProjectMaterialStatus,
};
use crate::types::Timestamp;

/// Separator between an existing notes field and an appended block.
pub const NOTE_SEPARATOR: &str = "\n\n";

/// Append a note block to existing free text, never overwriting it.
pub fn append_note_block(existing: Option<&str>, block: &str) -> String {
    match existing {
        Some(current) if !current.trim().is_empty() => {
            format!("{current}{NOTE_SEPARATOR}{block}")
        }
        _ => block.to_string(),
    }
}

/// Build the patch applying one dispatch material onto an existing project
/// material.
///
/// Dispatch-authoritative fields are merged; under
/// [`MergePolicy::DispatchFieldsOnly`] optional fields the project side has
/// already filled in (cost, location) are preserved. The status is included
/// only when it advances under the regression guard, and reaching
/// `Delivered` stamps a delivery date if none is set.
pub fn build_update_patch(
    note: &DispatchNote,
    material: &DispatchMaterial,
    existing: &ProjectMaterial,
    sync_status: bool,
    policy: MergePolicy,
    now: Timestamp,
) -> ProjectMaterialPatch {
    let mut patch = ProjectMaterialPatch {
        quantity: Some(material.effective_quantity()),
        unit: Some(material.unit.clone()),
        unit_weight_kg: material.unit_weight_kg,
        total_weight_kg: material.total_weight_kg,
        ..ProjectMaterialPatch::default()
    };

    let dispatch_cost = material.unit_cost.filter(|c| *c > 0.0);
    patch.unit_cost = match policy {
        MergePolicy::Full => dispatch_cost,
        MergePolicy::DispatchFieldsOnly if existing.unit_cost.is_none() => dispatch_cost,
        MergePolicy::DispatchFieldsOnly => None,
    };
    if let Some(unit_cost) = patch.unit_cost.or(existing.unit_cost) {
        patch.total_cost = Some(unit_cost * material.effective_quantity());
    }

    let dispatch_location = material.location.clone();
    patch.location = match policy {
        MergePolicy::Full => dispatch_location,
        MergePolicy::DispatchFieldsOnly if existing.location.is_none() => dispatch_location,
        MergePolicy::DispatchFieldsOnly => None,
    };

    if sync_status {
        let candidate = to_project_status(material.status);
        patch.status = guarded_project_status(existing.status, candidate, false);
        let reaches_delivery = patch
            .status
            .is_some_and(|s| s.rank() >= ProjectMaterialStatus::Delivered.rank());
        if reaches_delivery && existing.delivery_date.is_none() {
            patch.delivery_date = Some(note.actual_delivery_date.unwrap_or(now));
        }
    }

    patch.append_notes = Some(update_note_block(note, material, now));
    patch
}

/// Synthesize a new dispatch-sourced project material.
///
/// `resolved_stock_price` is the catalog/stock unit price looked up by the
/// caller; it is preferred over a non-positive or absent dispatch price.
pub fn build_new_material(
    note: &DispatchNote,
    material: &DispatchMaterial,
    resolved_stock_price: Option<f64>,
    sync_status: bool,
    now: Timestamp,
) -> NewProjectMaterial {
    let quantity = material.effective_quantity();
    let unit_cost = material
        .unit_cost
        .filter(|c| *c > 0.0)
        .or(resolved_stock_price);

    let status = if sync_status {
        to_project_status(material.status)
    } else {
        ProjectMaterialStatus::Delivered
    };

    let delivery_date = if status.rank() >= ProjectMaterialStatus::Delivered.rank() {
        Some(note.actual_delivery_date.unwrap_or(now))
    } else {
        None
    };

    NewProjectMaterial {
        project_id: note.project_id.clone(),
        catalog_id: None,
        name: format!("{} {}", material.material_type, material.grade),
        material_type: material.material_type.clone(),
        profile: material.profile.clone(),
        grade: material.grade.clone(),
        dimensions: material
            .dimensions
            .iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(k, v)| (k.clone(), *v))
            .collect(),
        unit: material.unit.clone(),
        quantity,
        unit_weight_kg: material.unit_weight_kg,
        total_weight_kg: material.total_weight_kg,
        unit_cost,
        total_cost: unit_cost.map(|c| c * quantity),
        status,
        source: MaterialSource::Dispatch,
        source_id: Some(material.id.clone()),
        delivery_date,
        location: material.location.clone(),
        notes: Some(provenance_note(note, material)),
    }
}

/// The delimited block appended to notes on every dispatch-side update.
fn update_note_block(note: &DispatchNote, material: &DispatchMaterial, now: Timestamp) -> String {
    let date = note.actual_delivery_date.unwrap_or(now).format("%Y-%m-%d");
    if material.status == DispatchMaterialStatus::Damaged {
        let inspection = note
            .inspection_notes
            .as_deref()
            .map(|n| format!(" Inspection: {n}."))
            .unwrap_or_default();
        format!(
            "DAMAGE REPORT: {} {} from dispatch {} flagged damaged on {}.{}",
            material.effective_quantity(),
            material.unit,
            note.dispatch_number,
            date,
            inspection,
        )
    } else {
        format!(
            "Dispatch Update: {} {} received via dispatch {} on {}.",
            material.effective_quantity(),
            material.unit,
            note.dispatch_number,
            date,
        )
    }
}

/// Structured provenance string stamped onto created materials.
fn provenance_note(note: &DispatchNote, material: &DispatchMaterial) -> String {
    let mut lines = vec![format!("Created from dispatch {}", note.dispatch_number)];
    if let Some(supplier) = &note.supplier {
        lines.push(format!("Supplier: {supplier}"));
    }
    if let Some(delivered) = note.actual_delivery_date {
        lines.push(format!("Delivered: {}", delivered.format("%Y-%m-%d")));
    }
    if let Some(tracking) = &note.tracking_number {
        lines.push(format!("Tracking: {tracking}"));
    }
    if let Some(inspection) = &note.inspection_notes {
        lines.push(format!("Inspection: {inspection}"));
    }
    if material.status == DispatchMaterialStatus::Damaged {
        lines.push(format!(
            "DAMAGE REPORT: {} {} flagged damaged on arrival",
            material.effective_quantity(),
            material.unit,
        ));
    }
    lines.join("\n")
}
