//! Order service: the composition root
//!
//! The only surface the API layer calls. Ties the storage, the
//! single-writer actor, and the payment gateway together, enforces
//! ownership and role checks, and maps infrastructure failures onto
//! the caller-facing taxonomy — raw storage errors never cross this
//! boundary.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use momo_gateway::SandboxGateway;
//! use order_core::{Config, OrderService};
//!
//! #[tokio::main]
//! async fn main() -> order_core::Result<()> {
//!     let gateway = Arc::new(SandboxGateway::new());
//!     let service = OrderService::open(Config::default(), gateway).await?;
//!
//!     // let order = service.place_order(user_id, lines, None).await?;
//!
//!     service.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_order_actor, OrderHandle},
    config::Config,
    error::{Error, Result},
    metrics::Metrics,
    storage::Storage,
    types::{AttemptState, Caller, Order, OrderLine, OrderStatus, Product},
};
use momo_gateway::{ChargeRequest, GatewayStatus, Msisdn, PaymentGateway, ReferenceId};
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::time::Duration;
use uuid::Uuid;

/// Main order service interface
pub struct OrderService {
    /// Actor handle for mutations
    handle: OrderHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Payment gateway collaborator
    gateway: Arc<dyn PaymentGateway>,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl OrderService {
    /// Open the service with configuration and a gateway implementation
    pub async fn open(config: Config, gateway: Arc<dyn PaymentGateway>) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let metrics =
            Metrics::new().map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;
        let handle = spawn_order_actor(storage.clone(), metrics.clone());

        Ok(Self {
            handle,
            storage,
            gateway,
            metrics,
            config,
        })
    }

    /// Place an order for a user
    ///
    /// All-or-nothing: on any failing line, no order row and no stock
    /// change persist. A failed write surfaces as `Transient`; the
    /// caller retries the whole operation, never a part of it.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        lines: Vec<OrderLine>,
        claimed_total: Option<Decimal>,
    ) -> Result<Order> {
        map_write(self.handle.place_order(user_id, lines, claimed_total).await)
    }

    /// Get an order with its items, ownership-checked
    ///
    /// A user reads only their own orders; anything else reports
    /// `OrderNotFound` so existence never leaks. Admins read any.
    pub async fn get_order(&self, order_id: Uuid, caller: &Caller) -> Result<Order> {
        let order = self.read_retry(|s| s.get_order(order_id)).await?;

        if order.user_id != caller.user_id && !caller.role.is_admin() {
            return Err(Error::OrderNotFound(order_id.to_string()));
        }

        Ok(order)
    }

    /// List a user's orders, newest first
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.read_retry(|s| s.list_user_orders(user_id)).await
    }

    /// Administrative order-status transition
    ///
    /// Restricted to admin callers; off-table transitions fail with
    /// `InvalidTransition` and leave the order unchanged.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        caller: &Caller,
    ) -> Result<Order> {
        if !caller.role.is_admin() {
            return Err(Error::Forbidden(
                "Order status updates require an administrative caller".to_string(),
            ));
        }

        map_write(self.handle.update_status(order_id, new_status).await)
    }

    /// Initiate a payment attempt for an order
    ///
    /// The gateway call happens with no storage lock held; the
    /// already-paid check runs once on the read path (cheap rejection
    /// before charging) and again atomically when the attempt row is
    /// recorded. Returns the gateway reference to poll or reconcile.
    pub async fn initiate_payment(
        &self,
        order_id: Uuid,
        payer_phone: &str,
        caller: &Caller,
    ) -> Result<ReferenceId> {
        let order = self.get_order(order_id, caller).await?;

        if self.read_retry(|s| s.has_successful_attempt(order_id)).await? {
            return Err(Error::OrderAlreadyPaid(order_id));
        }

        let payer = Msisdn::new(payer_phone)
            .map_err(|_| Error::Validation(format!("Invalid payer phone: {}", payer_phone)))?;

        let charge = ChargeRequest {
            amount: order.total,
            currency: self.config.gateway.currency.clone(),
            payer,
            external_id: Some(order_id.to_string()),
            payer_message: self.config.gateway.payer_message.clone(),
            payee_note: self.config.gateway.payee_note.clone(),
        };

        let reference = self.gateway.request_to_pay(charge).await?;

        match self.handle.record_attempt(order_id, reference.clone(), order.total).await {
            Ok(attempt) => Ok(attempt.reference),
            Err(Error::OrderAlreadyPaid(id)) => {
                // The charge went out but a concurrent attempt won;
                // operators reconcile the stray charge from the log.
                tracing::warn!(
                    %reference,
                    order_id = %id,
                    "Charge submitted for an order paid concurrently"
                );
                Err(Error::OrderAlreadyPaid(id))
            }
            Err(other) => Err(map_write_err(other)),
        }
    }

    /// Apply an externally delivered payment status (callback path)
    ///
    /// Idempotent. A delivery contradicting recorded terminal state is
    /// logged and swallowed — the record does not change, so the
    /// caller sees success.
    pub async fn apply_payment_status(
        &self,
        reference: &ReferenceId,
        status: GatewayStatus,
        amount: Decimal,
    ) -> Result<()> {
        let state = AttemptState::from(status);
        match self.handle.apply_status(reference.clone(), state, amount).await {
            Err(Error::ReconciliationConflict(msg)) => {
                tracing::warn!(%reference, %msg, "Reconciliation conflict ignored");
                Ok(())
            }
            other => map_write(other),
        }
    }

    /// Poll the gateway for an attempt's status and reconcile it
    pub async fn poll_payment(&self, reference: &ReferenceId) -> Result<()> {
        let report = self.gateway.request_status(reference).await?;
        self.apply_payment_status(&report.reference, report.status, report.amount)
            .await
    }

    /// Catalog collaborator seam: create or replace a product row
    pub async fn upsert_product(&self, product: Product) -> Result<()> {
        map_write(self.handle.upsert_product(product).await)
    }

    /// Get a product row
    pub async fn get_product(&self, product_id: Uuid) -> Result<Product> {
        self.read_retry(|s| s.get_product(product_id)).await
    }

    /// Operator restock entry (clamped compensating release)
    pub async fn release_stock(&self, product_id: Uuid, quantity: u32) -> Result<u32> {
        map_write(self.handle.release_stock(product_id, quantity).await)
    }

    /// Get metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown service
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }

    /// Run a read-only storage operation, retried once with jittered
    /// backoff on a storage-layer failure
    async fn read_retry<T, F>(&self, op: F) -> Result<T>
    where
        F: Fn(&Storage) -> Result<T>,
    {
        match op(&self.storage) {
            Err(Error::Storage(first)) => {
                let jitter = rand::thread_rng().gen_range(0..=self.config.retry.read_jitter_ms);
                let backoff = Duration::from_millis(self.config.retry.read_backoff_ms + jitter);
                tracing::warn!(error = %first, backoff_ms = backoff.as_millis() as u64, "Read failed, retrying once");
                tokio::time::sleep(backoff).await;

                op(&self.storage).map_err(map_write_err)
            }
            other => other,
        }
    }
}

/// Map a failed write onto `Transient`: the caller retries the whole
/// operation, nothing is resumed partway
fn map_write<T>(result: Result<T>) -> Result<T> {
    result.map_err(map_write_err)
}

fn map_write_err(err: Error) -> Error {
    match err {
        Error::Storage(msg) => Error::Transient(msg),
        other => other,
    }
}
