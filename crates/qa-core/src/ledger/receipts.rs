use chrono::{DateTime, Utc};

use super::Ledger;
use crate::error::{CoreError, CoreResult};
use crate::ids::{ProjectId, RequestToken};
use crate::receipt::{Receipt, ReceiptCheck, ReceiptState, RequestKey};

impl Ledger {
    /// Register a generation request before calling the backend.
    ///
    /// A completed receipt for the same request is returned for replay. A
    /// pending or failed one is reset and retried. Reusing a token for a
    /// different request is a conflict.
    pub fn begin_request(&mut self, key: &RequestKey, now: DateTime<Utc>) -> CoreResult<ReceiptCheck> {
        if let Some(existing) = self.receipts.get(&key.token) {
            if !key.matches(existing) {
                return Err(CoreError::conflict(
                    "request token",
                    &key.token,
                    format!(
                        "already used for {} of '{}'",
                        existing.operation, existing.target
                    ),
                ));
            }
            if existing.state == ReceiptState::Completed {
                log::debug!("replaying completed request {}", key.token);
                return Ok(ReceiptCheck::Replay(existing.clone()));
            }
            log::debug!("retrying {} request {}", existing.state, key.token);
        }

        // tokens spent on earlier failed attempts still count toward usage
        let (created_at, spent) = self
            .receipts
            .get(&key.token)
            .map_or((now, 0), |r| (r.created_at, r.tokens_used));
        self.receipts.insert(
            key.token.clone(),
            Receipt {
                token: key.token.clone(),
                operation: key.operation,
                project_id: key.project_id.clone(),
                target: key.target.clone(),
                fingerprint: key.fingerprint.clone(),
                state: ReceiptState::Pending,
                produced: Vec::new(),
                tokens_used: spent,
                error: None,
                created_at,
                updated_at: now,
            },
        );
        self.dirty = true;
        Ok(ReceiptCheck::Proceed)
    }

    /// Mark a pending request completed with the ids it produced
    pub fn complete_request(
        &mut self,
        token: &RequestToken,
        produced: Vec<String>,
        tokens_used: u64,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let receipt = self.pending_receipt(token)?;
        receipt.state = ReceiptState::Completed;
        receipt.produced = produced;
        receipt.tokens_used += tokens_used;
        receipt.updated_at = now;
        self.dirty = true;
        Ok(())
    }

    /// Mark a pending request failed; it may be retried with the same token
    pub fn fail_request(
        &mut self,
        token: &RequestToken,
        error: &str,
        tokens_used: u64,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let receipt = self.pending_receipt(token)?;
        receipt.state = ReceiptState::Failed;
        receipt.error = Some(error.to_string());
        receipt.tokens_used += tokens_used;
        receipt.updated_at = now;
        self.dirty = true;
        Ok(())
    }

    fn pending_receipt(&mut self, token: &RequestToken) -> CoreResult<&mut Receipt> {
        let receipt = self
            .receipts
            .get_mut(token)
            .ok_or_else(|| CoreError::not_found("request", token))?;
        if receipt.state != ReceiptState::Pending {
            return Err(CoreError::conflict(
                "request token",
                token,
                format!("request is already {}", receipt.state),
            ));
        }
        Ok(receipt)
    }

    pub fn receipt(&self, token: &RequestToken) -> CoreResult<&Receipt> {
        self.receipts
            .get(token)
            .ok_or_else(|| CoreError::not_found("request", token))
    }

    /// Receipts, newest first, optionally restricted to one project
    pub fn receipts(&self, project_id: Option<&ProjectId>) -> Vec<&Receipt> {
        let mut receipts: Vec<&Receipt> = self
            .receipts
            .values()
            .filter(|r| project_id.map_or(true, |p| &r.project_id == p))
            .collect();
        receipts.sort_by_key(|r| std::cmp::Reverse(r.updated_at));
        receipts
    }

    /// Tokens reported by the generation backend, summed over receipts
    pub fn token_usage(&self, project_id: Option<&ProjectId>) -> u64 {
        self.receipts
            .values()
            .filter(|r| project_id.map_or(true, |p| &r.project_id == p))
            .map(|r| r.tokens_used)
            .sum()
    }
}
