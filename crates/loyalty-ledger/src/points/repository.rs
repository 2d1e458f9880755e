use crate::ledger::CustomerCode;
use crate::store::StoreError;

use super::account::PointsAccount;

/// Storage for points accounts, one per sales ledger customer.
///
/// Implementations must serialize `update` calls per customer and must not hold an
/// exclusive lock across customers while doing so.
pub trait PointsRepository: Send + Sync {
    fn fetch(&self, code: &CustomerCode) -> Result<Option<PointsAccount>, StoreError>;

    /// Create path: fails with `Conflict` when an account exists and with
    /// `MissingCustomer` when the ledger has no such customer.
    fn create(&self, account: PointsAccount) -> Result<(), StoreError>;

    /// Update path: run `apply` against the account while holding its lock and commit
    /// the result after re-checking the invariant. `Ok(None)` when no account exists.
    fn update<T, F>(&self, code: &CustomerCode, apply: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut PointsAccount) -> T;
}
