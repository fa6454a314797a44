//! # shield-settlement
//!
//! **Payout plane**: governance-approved reimbursement claims paid out of
//! the locked collateral backing a shield purchase.
//!
//! ## Architecture
//!
//! [`ClaimRegistry`] holds claims filed by the governance hooks. When the
//! beneficiary withdraws, [`settle_reimbursement`]:
//! 1. Validates the claim (Approved, unpaid, caller is beneficiary)
//! 2. Settles the rewards of providers whose weight is about to shrink
//! 3. Consumes locked collateral pro-rata across providers
//! 4. Reduces pool collateral, shield issued and purchase coverage
//! 5. Marks the claim Paid and records the supply outflow

pub mod reimbursement;

pub use reimbursement::{settle_reimbursement, ClaimRegistry, Payout, SettlementState};
