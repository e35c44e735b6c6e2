//! Idempotency receipts for generation requests.
//!
//! Every generation request is tracked by a [`Receipt`] keyed on its
//! [`RequestToken`]. A retried request with the same token and the same
//! fingerprint replays the recorded outcome; the same token on a different
//! request is a conflict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checksum::compute_checksum;
use crate::ids::{ProjectId, RequestToken};
use crate::status_enum::define_status_enum;

define_status_enum! {
    /// Generation operation a receipt tracks
    pub enum Operation {
        AnalyzeRequirement => "analyze-requirement",
        GenerateScenarios => "generate-scenarios",
        GenerateTestCases => "generate-test-cases",
        GenerateScript => "generate-script",
    }
}

define_status_enum! {
    pub enum ReceiptState {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Record of one generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub token: RequestToken,
    pub operation: Operation,
    pub project_id: ProjectId,
    /// Entity the request operates on
    pub target: String,
    /// Checksum of the request parameters
    pub fingerprint: String,
    pub state: ReceiptState,
    /// Ids of entities the request produced
    #[serde(default)]
    pub produced: Vec<String>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters identifying one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
    pub token: RequestToken,
    pub operation: Operation,
    pub project_id: ProjectId,
    pub target: String,
    pub fingerprint: String,
}

impl RequestKey {
    /// Build a key; `params` are the request parameters that must match on retry
    pub fn new(
        token: RequestToken,
        operation: Operation,
        project_id: ProjectId,
        target: impl Into<String>,
        params: &str,
    ) -> Self {
        let target = target.into();
        let fingerprint = compute_checksum(&format!("{operation}\u{1f}{target}\u{1f}{params}"));
        Self {
            token,
            operation,
            project_id,
            target,
            fingerprint,
        }
    }

    pub(crate) fn matches(&self, receipt: &Receipt) -> bool {
        receipt.operation == self.operation
            && receipt.target == self.target
            && receipt.fingerprint == self.fingerprint
    }
}

/// What a caller should do with a request after consulting the receipts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptCheck {
    /// First attempt, or a retry after a failed or abandoned attempt
    Proceed,
    /// Already completed; replay this receipt
    Replay(Receipt),
}
