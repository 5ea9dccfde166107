//! Actor-based concurrency for the order store
//!
//! All mutations funnel through one actor task, the store's single
//! logical writer:
//! - concurrent reservations against the same product serialize, so
//!   two buyers can never both take the last unit
//! - status applications for the same payment reference serialize, so
//!   duplicate deliveries cannot race the idempotence check
//! - every mutation commits as one `WriteBatch`, first-committed-wins
//!
//! Reads bypass the actor and hit storage directly. The mailbox is
//! bounded for backpressure; no gateway network call ever runs inside
//! the actor.

use crate::{
    builder, inventory, reconcile,
    types::{AttemptState, Order, OrderLine, OrderStatus, PaymentAttempt, Product},
    Error, Metrics, Result, Storage,
};
use momo_gateway::ReferenceId;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the order actor
pub enum OrderMessage {
    /// Build, price, and commit an order
    PlaceOrder {
        /// Owning user
        user_id: Uuid,
        /// Requested lines, in input order
        lines: Vec<OrderLine>,
        /// Client-claimed total, compared as a fraud signal only
        claimed_total: Option<Decimal>,
        /// Reply channel
        response: oneshot::Sender<Result<Order>>,
    },

    /// Record a PENDING payment attempt
    RecordAttempt {
        /// Target order
        order_id: Uuid,
        /// Gateway charge reference
        reference: ReferenceId,
        /// Requested amount
        amount: Decimal,
        /// Reply channel
        response: oneshot::Sender<Result<PaymentAttempt>>,
    },

    /// Apply a gateway-reported state to an attempt
    ApplyStatus {
        /// Gateway charge reference
        reference: ReferenceId,
        /// Reported state
        state: AttemptState,
        /// Reported amount
        amount: Decimal,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Administrative order-status transition
    UpdateStatus {
        /// Target order
        order_id: Uuid,
        /// Requested status
        new_status: OrderStatus,
        /// Reply channel
        response: oneshot::Sender<Result<Order>>,
    },

    /// Operator restock (compensating release)
    ReleaseStock {
        /// Target product
        product_id: Uuid,
        /// Quantity to release
        quantity: u32,
        /// Reply channel, carries the quantity actually restocked
        response: oneshot::Sender<Result<u32>>,
    },

    /// Catalog collaborator write
    UpsertProduct {
        /// Product row to store
        product: Product,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes order mutations
pub struct OrderActor {
    storage: Arc<Storage>,
    metrics: Metrics,
    mailbox: mpsc::Receiver<OrderMessage>,
}

impl OrderActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        metrics: Metrics,
        mailbox: mpsc::Receiver<OrderMessage>,
    ) -> Self {
        Self {
            storage,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                OrderMessage::Shutdown => break,
                other => self.handle_message(other),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: OrderMessage) {
        match msg {
            OrderMessage::PlaceOrder {
                user_id,
                lines,
                claimed_total,
                response,
            } => {
                let started = std::time::Instant::now();
                let result = self.place_order(user_id, &lines, claimed_total);
                self.metrics
                    .record_commit_duration(started.elapsed().as_secs_f64());
                let _ = response.send(result);
            }

            OrderMessage::RecordAttempt {
                order_id,
                reference,
                amount,
                response,
            } => {
                let result = reconcile::record_attempt(
                    &self.storage,
                    &self.metrics,
                    order_id,
                    reference,
                    amount,
                );
                let _ = response.send(result);
            }

            OrderMessage::ApplyStatus {
                reference,
                state,
                amount,
                response,
            } => {
                let result =
                    reconcile::apply_status(&self.storage, &self.metrics, &reference, state, amount);
                let _ = response.send(result);
            }

            OrderMessage::UpdateStatus {
                order_id,
                new_status,
                response,
            } => {
                let _ = response.send(self.update_status(order_id, new_status));
            }

            OrderMessage::ReleaseStock {
                product_id,
                quantity,
                response,
            } => {
                let result =
                    inventory::release(&self.storage, &self.metrics, product_id, quantity);
                let _ = response.send(result);
            }

            OrderMessage::UpsertProduct { product, response } => {
                let _ = response.send(self.storage.put_product(&product));
            }

            OrderMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    fn place_order(
        &self,
        user_id: Uuid,
        lines: &[OrderLine],
        claimed_total: Option<Decimal>,
    ) -> Result<Order> {
        let draft = match builder::build_order(&self.storage, user_id, lines, claimed_total) {
            Ok(draft) => draft,
            Err(err) => {
                if matches!(err, Error::InsufficientStock { .. }) {
                    self.metrics.record_insufficient_stock();
                }
                return Err(err);
            }
        };

        self.storage.commit_order(&draft.order, &draft.rows)?;
        self.metrics.record_order_placed();

        tracing::info!(
            order_id = %draft.order.order_id,
            %user_id,
            total = %draft.order.total,
            items = draft.order.items.len(),
            "Order placed"
        );

        Ok(draft.order)
    }

    fn update_status(&self, order_id: Uuid, new_status: OrderStatus) -> Result<Order> {
        let mut order = self.storage.get_order(order_id)?;

        if !order.status.can_transition_to(new_status) {
            return Err(Error::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }

        let previous = order.status;
        order.status = new_status;
        order.updated_at = chrono::Utc::now();
        self.storage.update_order(&order)?;

        tracing::info!(%order_id, from = %previous, to = %new_status, "Order status updated");

        Ok(order)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct OrderHandle {
    sender: mpsc::Sender<OrderMessage>,
}

impl OrderHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<OrderMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        msg: OrderMessage,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Build, price, and commit an order
    pub async fn place_order(
        &self,
        user_id: Uuid,
        lines: Vec<OrderLine>,
        claimed_total: Option<Decimal>,
    ) -> Result<Order> {
        let (tx, rx) = oneshot::channel();
        self.request(
            OrderMessage::PlaceOrder {
                user_id,
                lines,
                claimed_total,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Record a PENDING payment attempt
    pub async fn record_attempt(
        &self,
        order_id: Uuid,
        reference: ReferenceId,
        amount: Decimal,
    ) -> Result<PaymentAttempt> {
        let (tx, rx) = oneshot::channel();
        self.request(
            OrderMessage::RecordAttempt {
                order_id,
                reference,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Apply a gateway-reported state to an attempt
    pub async fn apply_status(
        &self,
        reference: ReferenceId,
        state: AttemptState,
        amount: Decimal,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(
            OrderMessage::ApplyStatus {
                reference,
                state,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Administrative order-status transition
    pub async fn update_status(&self, order_id: Uuid, new_status: OrderStatus) -> Result<Order> {
        let (tx, rx) = oneshot::channel();
        self.request(
            OrderMessage::UpdateStatus {
                order_id,
                new_status,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Operator restock
    pub async fn release_stock(&self, product_id: Uuid, quantity: u32) -> Result<u32> {
        let (tx, rx) = oneshot::channel();
        self.request(
            OrderMessage::ReleaseStock {
                product_id,
                quantity,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Catalog collaborator write
    pub async fn upsert_product(&self, product: Product) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(OrderMessage::UpsertProduct { product, response: tx }, rx)
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(OrderMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the order actor
pub fn spawn_order_actor(storage: Arc<Storage>, metrics: Metrics) -> OrderHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = OrderActor::new(storage, metrics, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    OrderHandle::new(tx)
}
