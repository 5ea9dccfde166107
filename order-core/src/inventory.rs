//! Inventory ledger: atomic bounded-counter reservation
//!
//! The authoritative per-product available quantity lives in the
//! product row. Reservation decrements it; release compensates. All
//! mutations run on the single-writer actor, so two concurrent
//! requests for the last unit can never both observe it available.

use crate::{
    error::{Error, Result},
    metrics::Metrics,
    storage::Storage,
    types::Product,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Staged reservations for one order attempt
///
/// Product rows load lazily into a local view; decrements accumulate
/// there so duplicate lines for one product observe earlier staged
/// reservations. Nothing persists until the rows are handed to the
/// order commit batch, which makes a failed attempt free of side
/// effects by construction.
pub struct StockReservation<'a> {
    storage: &'a Storage,
    touched: HashMap<Uuid, Product>,
}

impl<'a> StockReservation<'a> {
    /// Start an empty staged view
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            touched: HashMap::new(),
        }
    }

    /// Reserve `quantity` units of a product
    ///
    /// Returns the unit price read at reservation time; the caller
    /// captures it on the order item so later catalog price changes
    /// never leak into the order.
    pub fn reserve(&mut self, product_id: Uuid, quantity: u32) -> Result<Decimal> {
        let product = match self.touched.entry(product_id) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(self.storage.get_product(product_id)?)
            }
        };

        if product.stock < quantity {
            return Err(Error::InsufficientStock {
                product: product.title.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= quantity;
        product.reserved += quantity;
        product.updated_at = Utc::now();

        Ok(product.unit_price)
    }

    /// Hand the staged rows to the caller for an atomic commit
    pub fn into_rows(self) -> Vec<Product> {
        self.touched.into_values().collect()
    }
}

/// Compensating restock, clamped at the outstanding reservation
///
/// Returns the quantity actually restocked. Releasing more than was
/// ever reserved is clamped at zero and flagged as an anomaly instead
/// of inflating stock, so the call is safe to repeat.
pub fn release(
    storage: &Storage,
    metrics: &Metrics,
    product_id: Uuid,
    quantity: u32,
) -> Result<u32> {
    let mut product = storage.get_product(product_id)?;

    let restocked = quantity.min(product.reserved);
    if restocked < quantity {
        tracing::warn!(
            product_id = %product_id,
            requested = quantity,
            outstanding = product.reserved,
            "Over-release clamped"
        );
        metrics.record_release_anomaly();
    }

    if restocked > 0 {
        product.stock += restocked;
        product.reserved -= restocked;
        product.updated_at = Utc::now();
        storage.put_product(&product)?;

        tracing::info!(
            product_id = %product_id,
            restocked,
            stock = product.stock,
            "Stock released"
        );
    }

    Ok(restocked)
}
