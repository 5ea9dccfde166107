//! Order aggregate builder
//!
//! Converts a validated line-item list into an immutable order plus
//! staged stock decrements, or fails with no effect at all. The first
//! failing product names the error surfaced to the caller; callers may
//! let the end user retry with an adjusted cart.

use crate::{
    error::{Error, Result},
    inventory::StockReservation,
    storage::Storage,
    types::{Order, OrderItem, OrderLine, OrderStatus, Product},
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// An order built and priced but not yet committed
#[derive(Debug)]
pub struct OrderDraft {
    /// The order row to insert
    pub order: Order,
    /// Product rows carrying the staged stock decrements
    pub rows: Vec<Product>,
}

/// Build an order draft for `user_id` from the requested lines
///
/// Validation happens before any row is touched: the line list must be
/// non-empty and every quantity at least 1. Each line then reserves
/// against the staged view in input order, capturing the unit price it
/// read. The total is always server-computed; a claimed total is only
/// compared and logged as a fraud signal on mismatch.
pub fn build_order(
    storage: &Storage,
    user_id: Uuid,
    lines: &[OrderLine],
    claimed_total: Option<Decimal>,
) -> Result<OrderDraft> {
    if lines.is_empty() {
        return Err(Error::Validation("Order items are required".to_string()));
    }
    if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
        return Err(Error::Validation(format!(
            "Quantity must be at least 1 for product {}",
            line.product_id
        )));
    }

    let mut reservation = StockReservation::new(storage);
    let mut items = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for line in lines {
        let unit_price = reservation.reserve(line.product_id, line.quantity)?;
        total += unit_price * Decimal::from(line.quantity);
        items.push(OrderItem {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price,
        });
    }

    if let Some(claimed) = claimed_total {
        if claimed != total {
            tracing::warn!(
                %user_id,
                %claimed,
                computed = %total,
                "Client-claimed total disagrees with computed total"
            );
        }
    }

    let now = Utc::now();
    let order = Order {
        order_id: Uuid::now_v7(),
        user_id,
        total,
        status: OrderStatus::Pending,
        items,
        created_at: now,
        updated_at: now,
    };

    Ok(OrderDraft {
        order,
        rows: reservation.into_rows(),
    })
}
