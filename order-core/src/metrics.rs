//! Metrics collection for observability
//!
//! Prometheus metrics for monitoring the order core.
//!
//! # Metrics
//!
//! - `orders_placed_total` - Orders committed
//! - `orders_insufficient_stock_total` - Reservations refused for lack of stock
//! - `order_commit_duration_seconds` - Histogram of order-commit latencies
//! - `payment_attempts_total` - Payment attempts recorded
//! - `payments_succeeded_total` / `payments_failed_total` - Terminal outcomes applied
//! - `reconciliation_conflicts_total` - Contradictory terminal deliveries ignored
//! - `amount_mismatches_total` - Gateway-reported amounts disagreeing with the attempt
//! - `release_anomalies_total` - Over-releases clamped at zero

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Orders committed
    pub orders_placed: IntCounter,

    /// Reservations refused for lack of stock
    pub insufficient_stock: IntCounter,

    /// Order-commit latency histogram
    pub commit_duration: Histogram,

    /// Payment attempts recorded
    pub payment_attempts: IntCounter,

    /// Successful terminal outcomes applied
    pub payments_succeeded: IntCounter,

    /// Failed terminal outcomes applied
    pub payments_failed: IntCounter,

    /// Contradictory terminal deliveries ignored
    pub reconciliation_conflicts: IntCounter,

    /// Gateway amounts disagreeing with the recorded attempt
    pub amount_mismatches: IntCounter,

    /// Over-releases clamped at zero
    pub release_anomalies: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let orders_placed =
            IntCounter::new("orders_placed_total", "Orders committed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let insufficient_stock = IntCounter::new(
            "orders_insufficient_stock_total",
            "Reservations refused for lack of stock",
        )?;
        registry.register(Box::new(insufficient_stock.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "order_commit_duration_seconds",
                "Histogram of order-commit latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        let payment_attempts =
            IntCounter::new("payment_attempts_total", "Payment attempts recorded")?;
        registry.register(Box::new(payment_attempts.clone()))?;

        let payments_succeeded =
            IntCounter::new("payments_succeeded_total", "Successful terminal outcomes applied")?;
        registry.register(Box::new(payments_succeeded.clone()))?;

        let payments_failed =
            IntCounter::new("payments_failed_total", "Failed terminal outcomes applied")?;
        registry.register(Box::new(payments_failed.clone()))?;

        let reconciliation_conflicts = IntCounter::new(
            "reconciliation_conflicts_total",
            "Contradictory terminal deliveries ignored",
        )?;
        registry.register(Box::new(reconciliation_conflicts.clone()))?;

        let amount_mismatches = IntCounter::new(
            "amount_mismatches_total",
            "Gateway amounts disagreeing with the recorded attempt",
        )?;
        registry.register(Box::new(amount_mismatches.clone()))?;

        let release_anomalies =
            IntCounter::new("release_anomalies_total", "Over-releases clamped at zero")?;
        registry.register(Box::new(release_anomalies.clone()))?;

        Ok(Self {
            orders_placed,
            insufficient_stock,
            commit_duration,
            payment_attempts,
            payments_succeeded,
            payments_failed,
            reconciliation_conflicts,
            amount_mismatches,
            release_anomalies,
            registry,
        })
    }

    /// Record a committed order
    pub fn record_order_placed(&self) {
        self.orders_placed.inc();
    }

    /// Record a reservation refused for lack of stock
    pub fn record_insufficient_stock(&self) {
        self.insufficient_stock.inc();
    }

    /// Record an order-commit latency
    pub fn record_commit_duration(&self, duration_seconds: f64) {
        self.commit_duration.observe(duration_seconds);
    }

    /// Record a payment attempt
    pub fn record_payment_attempt(&self) {
        self.payment_attempts.inc();
    }

    /// Record a successful terminal outcome
    pub fn record_payment_succeeded(&self) {
        self.payments_succeeded.inc();
    }

    /// Record a failed terminal outcome
    pub fn record_payment_failed(&self) {
        self.payments_failed.inc();
    }

    /// Record an ignored contradictory terminal delivery
    pub fn record_reconciliation_conflict(&self) {
        self.reconciliation_conflicts.inc();
    }

    /// Record an amount mismatch
    pub fn record_amount_mismatch(&self) {
        self.amount_mismatches.inc();
    }

    /// Record a clamped over-release
    pub fn record_release_anomaly(&self) {
        self.release_anomalies.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
