//! Wire types for the request-to-pay flow
//!
//! Shapes follow the MTN collection API: amounts travel as decimal
//! strings, payers are identified by digits-only MSISDN, and each
//! charge is keyed by a fresh v4 reference id.

use crate::error::{GatewayError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque charge reference
///
/// Generated locally (v4) and sent to the gateway as the tracking key
/// for one charge attempt. Treated as an opaque string everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Generate a fresh reference
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing reference string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payer phone number (MSISDN)
///
/// Normalized to digits only on construction; the gateway rejects
/// anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Msisdn(String);

impl Msisdn {
    /// Normalize and validate a phone number
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let digits: String = raw.as_ref().chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(GatewayError::InvalidMsisdn(raw.as_ref().to_string()));
        }
        Ok(Self(digits))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Msisdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request-to-pay charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Charge amount (exact decimal)
    pub amount: Decimal,

    /// ISO currency code (e.g. "RWF")
    pub currency: String,

    /// Payer phone number
    pub payer: Msisdn,

    /// Caller-side correlation id; defaults to the reference when absent
    pub external_id: Option<String>,

    /// Message shown to the payer
    pub payer_message: String,

    /// Note recorded for the payee
    pub payee_note: String,
}

impl ChargeRequest {
    /// Build the outbound JSON body for this charge
    ///
    /// The amount is rendered as a decimal string; the party id type is
    /// always MSISDN.
    pub fn to_body(&self, reference: &ReferenceId) -> serde_json::Value {
        serde_json::json!({
            "amount": self.amount.to_string(),
            "currency": self.currency,
            "externalId": self.external_id.as_deref().unwrap_or(reference.as_str()),
            "payer": {
                "partyIdType": "MSISDN",
                "partyId": self.payer.as_str(),
            },
            "payerMessage": self.payer_message,
            "payeeNote": self.payee_note,
        })
    }
}

/// Charge status as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    /// Charge submitted, payer has not acted yet
    Pending,
    /// Payer approved, funds collected (terminal)
    Successful,
    /// Payer rejected or charge expired (terminal)
    Failed,
}

impl GatewayStatus {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayStatus::Pending => "PENDING",
            GatewayStatus::Successful => "SUCCESSFUL",
            GatewayStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for GatewayStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(GatewayStatus::Pending),
            "SUCCESSFUL" => Ok(GatewayStatus::Successful),
            "FAILED" => Ok(GatewayStatus::Failed),
            other => Err(GatewayError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status report for one charge, from a poll or a callback delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// Charge reference
    pub reference: ReferenceId,

    /// Reported status
    pub status: GatewayStatus,

    /// Reported amount
    pub amount: Decimal,

    /// Reported currency
    pub currency: String,

    /// Gateway-side transaction id, present once settled
    pub financial_transaction_id: Option<String>,
}
