//! Stock-reservation side effects of status changes.
//!
//! Deliveries are earmarked for one project: the stock record created for a
//! dispatch material carries the entire delivered quantity as reserved and
//! zero available. Every failure in here is demoted to a recoverable
//! [`SyncError`] and a Warning transaction -- stock bookkeeping must never
//! fail the sync that triggered it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use matsync_core::model::{
    stock::dispatch_stock_key, DispatchMaterial, NewMaterialStock, NewStockTransaction,
    StockTransactionKind,
};
use matsync_core::types::RecordId;
use matsync_core::Result;
use matsync_store::MaterialStore;

use crate::error::{SyncError, SyncErrorCode};

/// Per-project reservation summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedSummary {
    pub total_reserved: f64,
    pub items: Vec<ReservedMaterial>,
}

/// One stock record's share of a project's reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedMaterial {
    pub stock_id: RecordId,
    pub reserved: f64,
}

/// Creates/reserves/unreserves stock records as a side effect of syncs.
pub struct StockCoordinator<S> {
    store: Arc<S>,
}

impl<S: MaterialStore> StockCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Unit price from an existing stock record for the material, if any.
    pub async fn stock_price(&self, material_id: &str) -> Option<f64> {
        let key = dispatch_stock_key(material_id);
        match self.store.material_stock_by_material_id(&key).await {
            Ok(stock) => stock.and_then(|s| s.unit_price),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Stock price lookup failed");
                None
            }
        }
    }

    /// Earmark an arrived/allocated dispatch material's delivery for the
    /// project: create (or re-reserve) its stock record fully reserved, then
    /// log an In and a Reserve transaction.
    pub async fn reserve_for_dispatch(
        &self,
        material: &DispatchMaterial,
        project_id: &str,
    ) -> std::result::Result<(), SyncError> {
        let key = dispatch_stock_key(&material.id);
        let quantity = material.effective_quantity();

        let outcome: Result<()> = async {
            match self.store.material_stock_by_material_id(&key).await? {
                None => {
                    self.store
                        .create_material_stock(NewMaterialStock {
                            id: Some(key.clone()),
                            project_id: Some(project_id.to_string()),
                            total_stock: quantity,
                            reserved_stock: quantity,
                            available_stock: 0.0,
                            unit_price: material.unit_cost,
                            location: material.location.clone(),
                        })
                        .await?;
                }
                Some(_) => {
                    self.store
                        .reserve_material_stock(&key, quantity, project_id)
                        .await?;
                }
            }
            self.log_transaction(&key, StockTransactionKind::In, quantity, project_id, material)
                .await?;
            self.log_transaction(&key, StockTransactionKind::Reserve, quantity, project_id, material)
                .await?;
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                tracing::info!(
                    stock_id = %key,
                    quantity,
                    project_id,
                    "Dispatch stock reserved",
                );
                Ok(())
            }
            Err(e) => Err(self.demote(&key, quantity, project_id, &material.id, e).await),
        }
    }

    /// Release the reservation when the material reaches installed/used,
    /// logging a Usage transaction.
    pub async fn release_for_usage(
        &self,
        material_id: &str,
        quantity: f64,
        project_id: &str,
    ) -> std::result::Result<(), SyncError> {
        let key = dispatch_stock_key(material_id);

        let outcome: Result<()> = async {
            self.store
                .unreserve_material_stock(&key, quantity, project_id)
                .await?;
            self.store
                .create_stock_transaction(NewStockTransaction {
                    stock_id: key.clone(),
                    kind: StockTransactionKind::Usage,
                    quantity,
                    project_id: Some(project_id.to_string()),
                    reference_id: Some(material_id.to_string()),
                    notes: None,
                })
                .await?;
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                tracing::info!(stock_id = %key, quantity, project_id, "Reserved stock released for usage");
                Ok(())
            }
            Err(e) => Err(self.demote(&key, quantity, project_id, material_id, e).await),
        }
    }

    /// Manual reservation entry point: earmark catalog stock for a project.
    ///
    /// Returns `false` (never errors) when the reservation cannot be made.
    pub async fn reserve_for_project(
        &self,
        catalog_id: &str,
        quantity: f64,
        project_id: &str,
        notes: Option<String>,
    ) -> bool {
        if let Err(e) = self
            .store
            .reserve_material_stock(catalog_id, quantity, project_id)
            .await
        {
            tracing::warn!(
                catalog_id,
                quantity,
                project_id,
                error = %e,
                "Manual stock reservation failed",
            );
            return false;
        }

        if let Err(e) = self
            .store
            .create_stock_transaction(NewStockTransaction {
                stock_id: catalog_id.to_string(),
                kind: StockTransactionKind::Reserve,
                quantity,
                project_id: Some(project_id.to_string()),
                reference_id: None,
                notes,
            })
            .await
        {
            // Reservation itself succeeded; the missing log entry is noted.
            tracing::warn!(catalog_id, error = %e, "Reserve transaction log failed");
        }
        true
    }

    /// Total reserved quantity for a project plus a per-material breakdown.
    pub async fn project_reserved_materials(&self, project_id: &str) -> Result<ReservedSummary> {
        let stock = self.store.material_stock_by_project(project_id).await?;
        let items: Vec<ReservedMaterial> = stock
            .into_iter()
            .filter(|s| s.reserved_stock > 0.0)
            .map(|s| ReservedMaterial {
                stock_id: s.id,
                reserved: s.reserved_stock,
            })
            .collect();
        Ok(ReservedSummary {
            total_reserved: items.iter().map(|i| i.reserved).sum(),
            items,
        })
    }

    /// Demote a store failure to a recoverable error plus a best-effort
    /// Warning transaction.
    async fn demote(
        &self,
        key: &str,
        quantity: f64,
        project_id: &str,
        material_id: &str,
        cause: matsync_core::CoreError,
    ) -> SyncError {
        tracing::warn!(
            stock_id = %key,
            quantity,
            project_id,
            error = %cause,
            "Stock update failed; sync continues",
        );
        let _ = self
            .store
            .create_stock_transaction(NewStockTransaction {
                stock_id: key.to_string(),
                kind: StockTransactionKind::Warning,
                quantity,
                project_id: Some(project_id.to_string()),
                reference_id: Some(material_id.to_string()),
                notes: Some(format!("stock update failed: {cause}")),
            })
            .await;
        SyncError::recoverable(
            SyncErrorCode::StockUpdateFailed,
            format!("stock update for {key} failed: {cause}"),
            Some(material_id.to_string()),
        )
    }

    async fn log_transaction(
        &self,
        key: &str,
        kind: StockTransactionKind,
        quantity: f64,
        project_id: &str,
        material: &DispatchMaterial,
    ) -> Result<()> {
        self.store
            .create_stock_transaction(NewStockTransaction {
                stock_id: key.to_string(),
                kind,
                quantity,
                project_id: Some(project_id.to_string()),
                reference_id: Some(material.id.clone()),
                notes: None,
            })
            .await?;
        Ok(())
    }
}
