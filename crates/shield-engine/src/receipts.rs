//! Bounded in-memory receipt log.
//!
//! Every committed transition appends one [`Receipt`]. Sequence numbers are
//! assigned here and never reused; when the log is full the oldest receipt
//! is evicted, so memory stays predictable in long-running hosts.

use std::collections::VecDeque;

use shield_types::{BlockContext, PoolId, Receipt, ReceiptType};

#[derive(Debug, Clone)]
pub struct ReceiptLog {
    /// Insertion order (front = oldest).
    receipts: VecDeque<Receipt>,
    capacity: usize,
    next_sequence: u64,
}

impl ReceiptLog {
    /// Create a log holding at most `capacity` receipts. A zero capacity is
    /// treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            receipts: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_sequence: 1,
        }
    }

    /// Append a receipt for a committed transition.
    pub fn append(
        &mut self,
        receipt_type: ReceiptType,
        ctx: &BlockContext,
        pool_id: Option<PoolId>,
        payload: Vec<u8>,
    ) -> &Receipt {
        if self.receipts.len() >= self.capacity {
            self.receipts.pop_front();
        }
        let receipt = Receipt::new(self.next_sequence, receipt_type, ctx, pool_id, payload);
        self.next_sequence += 1;
        self.receipts.push_back(receipt);
        &self.receipts[self.receipts.len() - 1]
    }

    /// Look up a receipt by sequence number, if it is still retained.
    #[must_use]
    pub fn get(&self, sequence: u64) -> Option<&Receipt> {
        let first = self.receipts.front()?.sequence;
        let offset = usize::try_from(sequence.checked_sub(first)?).ok()?;
        self.receipts.get(offset)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Receipt> {
        self.receipts.back()
    }

    /// Retained receipts, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Receipt> {
        self.receipts.iter()
    }

    /// Retained receipts touching `pool_id`.
    pub fn for_pool(&self, pool_id: PoolId) -> impl Iterator<Item = &Receipt> {
        self.receipts
            .iter()
            .filter(move |r| r.pool_id == Some(pool_id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    /// Sequence number the next receipt will get.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}

#[cfg(test)]
mod tests {
    use shield_types::OperationKind;

    use super::*;

    fn ty() -> ReceiptType {
        ReceiptType::Operation(OperationKind::DepositCollateral)
    }

    #[test]
    fn sequences_are_monotonic() {
        let mut log = ReceiptLog::new(10);
        let ctx = BlockContext::genesis();
        assert_eq!(log.append(ty(), &ctx, Some(PoolId(1)), vec![1]).sequence, 1);
        assert_eq!(log.append(ty(), &ctx, None, vec![2]).sequence, 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().unwrap().sequence, 2);
        assert_eq!(log.for_pool(PoolId(1)).count(), 1);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut log = ReceiptLog::new(3);
        let ctx = BlockContext::genesis();
        for i in 0..5u8 {
            log.append(ty(), &ctx, None, vec![i]);
        }
        assert_eq!(log.len(), 3);
        assert!(log.get(2).is_none());
        assert_eq!(log.get(3).unwrap().payload, vec![2]);
        assert_eq!(log.get(5).unwrap().payload, vec![4]);
        assert!(log.get(6).is_none());
        assert_eq!(log.next_sequence(), 6);
    }

    #[test]
    fn receipts_verify() {
        let mut log = ReceiptLog::new(1);
        let ctx = BlockContext::genesis();
        let receipt = log.append(ty(), &ctx, None, b"{}".to_vec());
        assert!(receipt.verify_hash());
    }
}
