//! # shield-engine
//!
//! Operation dispatcher for the **shield** pool and collateral accounting
//! engine. Hosts hand it authenticated [`Operation`]s together with a
//! [`BlockContext`]; it applies each one atomically and returns the outcome.
//!
//! - [`ShieldEngine`]: the single writer; `execute`, governance claim hooks,
//!   the end-of-block expiry sweep, and read-only queries
//! - [`ShieldState`]: every store in one cloneable value, cross-checked
//!   before each commit
//! - [`ReceiptLog`]: bounded audit trail of committed transitions
//! - [`telemetry`]: `tracing-subscriber` setup for embedding hosts
//!
//! [`Operation`]: shield_types::Operation
//! [`BlockContext`]: shield_types::BlockContext

mod dispatcher;
pub mod engine;
pub mod receipts;
pub mod state;
pub mod telemetry;

pub use engine::ShieldEngine;
pub use receipts::ReceiptLog;
pub use state::ShieldState;
pub use telemetry::{init_tracing, LogFormat};
