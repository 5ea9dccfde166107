//! Error types for the order core

use crate::types::OrderStatus;
use thiserror::Error;
use uuid::Uuid;

/// Result type for order-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Order-core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input shape, rejected before any transaction opens
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced product absent
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Referenced order absent (or not visible to the caller)
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Referenced payment attempt absent
    #[error("Payment attempt not found: {0}")]
    AttemptNotFound(String),

    /// Requested quantity exceeds available stock
    #[error("Insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product title, for the end-user message
        product: String,
        /// Requested quantity
        requested: u32,
        /// Available stock at the time of the attempt
        available: u32,
    },

    /// Order already has a successful payment attempt
    #[error("Order already paid: {0}")]
    OrderAlreadyPaid(Uuid),

    /// Order status transition outside the allowed table
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    /// Caller lacks the role this operation requires
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A status delivery contradicts recorded terminal state
    ///
    /// Logged and swallowed at the service boundary; the record does
    /// not change.
    #[error("Reconciliation conflict: {0}")]
    ReconciliationConflict(String),

    /// Write transaction failed; the caller should retry the whole operation
    #[error("Transient failure, retry the operation: {0}")]
    Transient(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Payment gateway error
    #[error("Gateway error: {0}")]
    Gateway(#[from] momo_gateway::GatewayError),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
