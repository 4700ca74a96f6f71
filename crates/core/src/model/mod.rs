//! Domain entity structs and DTOs.
//!
//! Each submodule contains:
//! - A `Serialize` + `Deserialize` entity struct
//! - A create DTO for new records
//! - A typed patch DTO (all `Option` fields) listing only fields
//!   intentionally changed

pub mod dispatch;
pub mod project;
pub mod stock;

pub use dispatch::{
    DispatchMaterial, DispatchMaterialPatch, DispatchNote, UsageEntry,
};
pub use project::{
    MaterialSource, NewProjectMaterial, Project, ProjectMaterial, ProjectMaterialPatch,
};
pub use stock::{
    MaterialStock, NewMaterialStock, NewStockTransaction, StockTransaction, StockTransactionKind,
};
