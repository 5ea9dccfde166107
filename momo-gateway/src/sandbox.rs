//! In-memory gateway for tests and local runs
//!
//! Charges start PENDING and stay there until a test resolves them,
//! which mirrors how the real collection API behaves between the
//! request-to-pay and the payer acting on their handset.

use crate::error::{GatewayError, Result};
use crate::wire::{ChargeRequest, GatewayStatus, ReferenceId, StatusReport};
use crate::PaymentGateway;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Scriptable in-memory payment gateway
#[derive(Default)]
pub struct SandboxGateway {
    charges: Mutex<HashMap<ReferenceId, StatusReport>>,
}

impl SandboxGateway {
    /// Create an empty sandbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a pending charge to a terminal status
    ///
    /// Re-resolving an already terminal charge overwrites the stored
    /// report; the order core is expected to ignore the contradiction.
    pub fn resolve(&self, reference: &ReferenceId, status: GatewayStatus) -> Result<()> {
        let mut charges = self.charges.lock();
        let report = charges
            .get_mut(reference)
            .ok_or_else(|| GatewayError::UnknownReference(reference.to_string()))?;

        report.status = status;
        if status == GatewayStatus::Successful {
            report.financial_transaction_id = Some(format!("ftx-{}", reference));
        }

        Ok(())
    }

    /// Number of charges submitted so far
    pub fn charge_count(&self) -> usize {
        self.charges.lock().len()
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn request_to_pay(&self, charge: ChargeRequest) -> Result<ReferenceId> {
        let reference = ReferenceId::generate();

        // Body construction is exercised even though nothing leaves the
        // process, so malformed charges fail here like they would live.
        let _body = charge.to_body(&reference);

        let report = StatusReport {
            reference: reference.clone(),
            status: GatewayStatus::Pending,
            amount: charge.amount,
            currency: charge.currency.clone(),
            financial_transaction_id: None,
        };

        self.charges.lock().insert(reference.clone(), report);

        tracing::debug!(
            reference = %reference,
            amount = %charge.amount,
            payer = %charge.payer,
            "Sandbox charge submitted"
        );

        Ok(reference)
    }

    async fn request_status(&self, reference: &ReferenceId) -> Result<StatusReport> {
        self.charges
            .lock()
            .get(reference)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownReference(reference.to_string()))
    }
}
