//! Mobile-money gateway boundary
//!
//! Wire types and the `PaymentGateway` trait the order core reconciles
//! against. The production HTTP transport lives outside this workspace;
//! what ships here is the contract plus an in-memory sandbox used by
//! tests and local runs.
//!
//! # Wire obligations
//!
//! - Outbound amounts are decimal strings in the shop currency
//! - Payer phone numbers are MSISDN, digits only
//! - Inbound status strings map onto exactly PENDING/SUCCESSFUL/FAILED

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod sandbox;
pub mod wire;

pub use error::{GatewayError, Result};
pub use sandbox::SandboxGateway;
pub use wire::{ChargeRequest, GatewayStatus, Msisdn, ReferenceId, StatusReport};

use async_trait::async_trait;

/// Payment gateway contract
///
/// One implementation per provider; the order core only ever talks to
/// this trait. Calls may block on the network, so callers must never
/// hold a storage transaction open across them.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submit a request-to-pay charge
    ///
    /// Returns the opaque reference id under which the gateway tracks
    /// the charge. The charge starts out PENDING.
    async fn request_to_pay(&self, charge: ChargeRequest) -> Result<ReferenceId>;

    /// Fetch the current status report for a submitted charge
    async fn request_status(&self, reference: &ReferenceId) -> Result<StatusReport>;
}
