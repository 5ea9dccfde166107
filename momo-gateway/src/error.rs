//! Error types for the gateway boundary

use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport failure (connection, timeout, non-2xx)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Gateway reported a status outside the three known values
    #[error("Unknown gateway status: {0}")]
    UnknownStatus(String),

    /// No charge recorded under this reference
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// Payer phone number contained no digits
    #[error("Invalid MSISDN: {0}")]
    InvalidMsisdn(String),
}
