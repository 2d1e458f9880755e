//! Storage backends shared by the sales ledger and the points accounts.

mod memory;

pub use memory::InMemoryLoyaltyStore;

use crate::ledger::CustomerCode;
use crate::points::IntegrityViolation;

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("points account for customer {0} already exists")]
    Conflict(CustomerCode),
    #[error("customer {0} has no sales ledger entry")]
    MissingCustomer(CustomerCode),
    #[error(transparent)]
    Integrity(#[from] IntegrityViolation),
    #[error("{0} table lock poisoned")]
    Poisoned(&'static str),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
