//! Material stock records and their transaction log.
//!
//! Stock produced by a dispatch is keyed by a derived id
//! (`dispatch-{materialId}`) and earmarked for one project: the entire
//! delivered quantity is reserved, nothing is general inventory.

use serde::{Deserialize, Serialize};

use crate::types::{RecordId, Timestamp};

/// Derived stock key for a dispatch material.
pub fn dispatch_stock_key(material_id: &str) -> String {
    format!("dispatch-{material_id}")
}

/// A stock record for one material key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialStock {
    /// The stock key, e.g. `dispatch-{materialId}` or a catalog id.
    pub id: RecordId,
    /// Project the stock is earmarked for, if any.
    pub project_id: Option<RecordId>,
    pub total_stock: f64,
    pub reserved_stock: f64,
    pub available_stock: f64,
    pub unit_price: Option<f64>,
    pub location: Option<String>,
    pub updated_at: Timestamp,
}

/// DTO for creating a stock record. The caller supplies the derived key as
/// `id`; the store mints one if absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaterialStock {
    pub id: Option<RecordId>,
    pub project_id: Option<RecordId>,
    pub total_stock: f64,
    pub reserved_stock: f64,
    pub available_stock: f64,
    pub unit_price: Option<f64>,
    pub location: Option<String>,
}

/// Kind of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockTransactionKind {
    /// Goods received into stock.
    In,
    /// Stock earmarked for a project.
    Reserve,
    /// Reservation released without consumption.
    Unreserve,
    /// Reserved stock consumed by installation.
    Usage,
    /// Non-fatal bookkeeping failure, recorded for audit.
    Warning,
}

/// One entry in the stock transaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: RecordId,
    pub stock_id: RecordId,
    pub kind: StockTransactionKind,
    pub quantity: f64,
    pub project_id: Option<RecordId>,
    /// Upstream record that caused the movement (dispatch material id).
    pub reference_id: Option<RecordId>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for appending a stock transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockTransaction {
    pub stock_id: RecordId,
    pub kind: StockTransactionKind,
    pub quantity: f64,
    pub project_id: Option<RecordId>,
    pub reference_id: Option<RecordId>,
    pub notes: Option<String>,
}
