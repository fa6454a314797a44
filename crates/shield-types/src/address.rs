//! Account addresses and the address-validity predicate.
//!
//! The host framework validates addresses before handing operations to the
//! engine, but the engine never assumes it: anything entering the core as a
//! new address (sponsor, foreign payout destination) goes through an
//! [`AddressValidator`] and is rejected with an error instead of a panic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, ShieldError};

/// Maximum accepted address length in bytes.
pub const MAX_ADDRESS_LEN: usize = 128;

/// An account address, kept as its canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Wrap a string without validation. Used for senders that the host has
    /// already authenticated.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Parse and validate an address with the default rules.
    ///
    /// # Errors
    /// Returns `InvalidAddress` if the string is not a well-formed address.
    pub fn parse(addr: &str) -> Result<Self> {
        BasicAddressValidator.validate(addr)?;
        Ok(Self(addr.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address is blank (empty or whitespace only).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Address-validity predicate supplied by the environment.
pub trait AddressValidator: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns `InvalidAddress` when `addr` is not acceptable.
    fn validate(&self, addr: &str) -> Result<()>;
}

/// Default predicate: non-blank, printable ASCII without whitespace, bounded length.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAddressValidator;

impl AddressValidator for BasicAddressValidator {
    fn validate(&self, addr: &str) -> Result<()> {
        let well_formed = !addr.is_empty()
            && addr.len() <= MAX_ADDRESS_LEN
            && addr.bytes().all(|b| b.is_ascii_graphic());
        if well_formed {
            Ok(())
        } else {
            Err(ShieldError::InvalidAddress(addr.to_string()))
        }
    }
}

/// Random addresses for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    pub fn dummy() -> Self {
        Self(format!("shield1{:016x}", rand::random::<u64>()))
    }
}
