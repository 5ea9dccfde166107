//! Kapee Order Core
//!
//! Transactional order-creation core for the Kapee storefront: stock
//! reservation, server-side pricing, and mobile-money payment
//! reconciliation over an embedded RocksDB store.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task serializes every mutation, so
//!   two buyers can never both take the last unit
//! - **Atomic Batches**: each order commits as one `WriteBatch`; a
//!   failed placement leaves no partial effects
//! - **Price Capture**: unit prices freeze on the order item at
//!   reservation time, catalog edits never rewrite history
//! - **Idempotent Reconciliation**: terminal payment outcomes apply
//!   exactly once across callback and polling delivery
//!
//! # Invariants
//!
//! - Stock never goes negative, for any interleaving of requests
//! - `order.total` == Σ(item.unit_price × item.quantity), always
//! - At most one SUCCESSFUL payment attempt per order
//! - Order status moves only along the lifecycle table

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod builder;
pub mod config;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod reconcile;
pub mod service;
pub mod storage;
pub mod types;

// Re-exports
pub use actor::{spawn_order_actor, OrderHandle};
pub use config::Config;
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use service::OrderService;
pub use storage::Storage;
pub use types::{
    AttemptState, Caller, Order, OrderItem, OrderLine, OrderStatus, PaymentAttempt, Product,
    Role,
};
