//! Receipt types for the engine's audit trail.
//!
//! Every committed state transition (operation, governance hook, expiry
//! sweep) produces a [`Receipt`] whose payload hash can be recomputed
//! independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{BlockContext, OperationKind, PoolId, ReceiptId};

/// The type of transition this receipt proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptType {
    /// One of the thirteen external operations committed.
    Operation(OperationKind),
    /// Governance registered a reimbursement claim.
    ClaimRegistered,
    /// Governance approved a claim.
    ClaimApproved,
    /// Governance rejected a claim.
    ClaimRejected,
    /// The expiry sweep released lapsed coverage.
    PurchasesExpired,
}

impl std::fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operation(kind) => write!(f, "OP_{}", kind.to_string().to_uppercase()),
            Self::ClaimRegistered => write!(f, "CLAIM_REGISTERED"),
            Self::ClaimApproved => write!(f, "CLAIM_APPROVED"),
            Self::ClaimRejected => write!(f, "CLAIM_REJECTED"),
            Self::PurchasesExpired => write!(f, "PURCHASES_EXPIRED"),
        }
    }
}

/// Proof that a state transition was committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    /// Position in the engine's commit order, starting at 1.
    pub sequence: u64,
    pub receipt_type: ReceiptType,
    /// Block height of the transition.
    pub height: u64,
    /// The pool touched, if the transition is scoped to one.
    pub pool_id: Option<PoolId>,
    /// JSON-serialized outcome of the transition.
    pub payload: Vec<u8>,
    /// SHA-256 hash of `payload`.
    pub payload_hash: [u8; 32],
    /// Block time of the transition.
    pub issued_at: DateTime<Utc>,
}

impl Receipt {
    /// Build a receipt, hashing the payload.
    #[must_use]
    pub fn new(
        sequence: u64,
        receipt_type: ReceiptType,
        ctx: &BlockContext,
        pool_id: Option<PoolId>,
        payload: Vec<u8>,
    ) -> Self {
        let payload_hash = Self::hash_payload(&payload);
        Self {
            id: ReceiptId::new(),
            sequence,
            receipt_type,
            height: ctx.height,
            pool_id,
            payload,
            payload_hash,
            issued_at: ctx.time,
        }
    }

    /// Domain-separated SHA-256 over a payload.
    #[must_use]
    pub fn hash_payload(payload: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"shield:receipt:v1:");
        hasher.update(payload);
        hasher.finalize().into()
    }

    /// Recompute the payload hash and compare.
    #[must_use]
    pub fn verify_hash(&self) -> bool {
        Self::hash_payload(&self.payload) == self.payload_hash
    }

    #[must_use]
    pub fn payload_hash_hex(&self) -> String {
        hex::encode(self.payload_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_type_display() {
        assert_eq!(
            ReceiptType::Operation(OperationKind::PurchaseShield).to_string(),
            "OP_PURCHASE_SHIELD"
        );
        assert_eq!(ReceiptType::ClaimApproved.to_string(), "CLAIM_APPROVED");
    }

    #[test]
    fn hash_verifies_and_detects_tampering() {
        let ctx = BlockContext::genesis();
        let mut receipt = Receipt::new(
            1,
            ReceiptType::ClaimRegistered,
            &ctx,
            Some(PoolId(1)),
            b"{\"amount\":300}".to_vec(),
        );
        assert!(receipt.verify_hash());
        assert_eq!(receipt.payload_hash_hex().len(), 64);
        receipt.payload = b"{\"amount\":301}".to_vec();
        assert!(!receipt.verify_hash());
    }

    #[test]
    fn receipt_type_serde_roundtrip() {
        let rt = ReceiptType::Operation(OperationKind::WithdrawReimbursement);
        let json = serde_json::to_string(&rt).unwrap();
        let back: ReceiptType = serde_json::from_str(&json).unwrap();
        assert_eq!(rt, back);
    }
}
