//! # shield-ledger
//!
//! **Custody layer**: who holds what in which pool.
//!
//! ## Architecture
//!
//! - [`BalanceLedger`]: collateral and stake positions per (pool, holder),
//!   with pool-level lock / unlock / consume spread pro-rata over providers
//! - [`PoolRegistry`]: pool records, admin updates, and the
//!   Active ⇄ Paused → Closed status machine
//! - [`SupplyConservation`]: per-denom inflow/outflow totals checked against
//!   actual custody before every commit

pub mod balance_ledger;
pub mod pool_registry;
pub mod supply_conservation;

pub use balance_ledger::{BalanceLedger, Debit, PositionKind};
pub use pool_registry::{NewPool, PoolRegistry, PoolUpdate};
pub use supply_conservation::SupplyConservation;
