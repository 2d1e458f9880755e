use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::account::{IntegrityViolation, PointsBalance};
use super::repository::PointsRepository;
use crate::ledger::CustomerCode;
use crate::store::StoreError;

/// Successful claim and the balance it left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    pub customer_code: CustomerCode,
    pub amount: Decimal,
    pub balance: PointsBalance,
}

/// Why a claim did not go through. Nothing is written in any of these cases.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("claim amount must be positive (got {0})")]
    InvalidAmount(Decimal),
    #[error("customer {0} has no points account")]
    UnknownCustomer(CustomerCode),
    #[error("insufficient points: requested {requested}, available {available}")]
    InsufficientPoints {
        requested: Decimal,
        available: Decimal,
    },
    #[error(transparent)]
    Integrity(IntegrityViolation),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ClaimError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Integrity(violation) => Self::Integrity(violation),
            other => Self::Store(other),
        }
    }
}

/// Rejection reason exposed to front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    InvalidAmount,
    UnknownCustomer,
    InsufficientPoints,
}

/// Wire form of a claim result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimOutcome {
    Claimed {
        amount: Decimal,
        balance: PointsBalance,
    },
    Rejected {
        reason: RejectionReason,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        available: Option<Decimal>,
    },
}

impl ClaimOutcome {
    /// Map a claim result to its wire form. Storage and integrity failures are not
    /// outcomes and are handed back to the caller untouched.
    pub fn from_result(result: Result<ClaimReceipt, ClaimError>) -> Result<Self, ClaimError> {
        match result {
            Ok(receipt) => Ok(Self::Claimed {
                amount: receipt.amount,
                balance: receipt.balance,
            }),
            Err(err) => {
                let (reason, available) = match &err {
                    ClaimError::InvalidAmount(_) => (RejectionReason::InvalidAmount, None),
                    ClaimError::UnknownCustomer(_) => (RejectionReason::UnknownCustomer, None),
                    ClaimError::InsufficientPoints { available, .. } => {
                        (RejectionReason::InsufficientPoints, Some(*available))
                    }
                    ClaimError::Integrity(_) | ClaimError::Store(_) => return Err(err),
                };
                Ok(Self::Rejected {
                    reason,
                    message: err.to_string(),
                    available,
                })
            }
        }
    }
}

/// Moves points from unclaimed to claimed, one customer at a time.
pub struct ClaimService<P> {
    accounts: Arc<P>,
}

impl<P> ClaimService<P>
where
    P: PointsRepository,
{
    pub fn new(accounts: Arc<P>) -> Self {
        Self { accounts }
    }

    /// Claim `amount` points for `code`.
    ///
    /// The balance check and the increment run inside a single `update` call, which holds
    /// the customer's account lock, so concurrent claims never observe a stale balance.
    pub fn claim(&self, code: &CustomerCode, amount: Decimal) -> Result<ClaimReceipt, ClaimError> {
        if amount <= Decimal::ZERO {
            return Err(ClaimError::InvalidAmount(amount));
        }

        let now = Utc::now();
        let applied = self.accounts.update(code, |account| {
            let available = account.unclaimed();
            if available < amount {
                return Err(ClaimError::InsufficientPoints {
                    requested: amount,
                    available,
                });
            }
            account
                .record_claim(amount, now)
                .map_err(ClaimError::Integrity)?;
            Ok(account.balance())
        })?;

        match applied {
            Some(Ok(balance)) => {
                info!(customer = %code, amount = %amount, unclaimed = %balance.unclaimed, "points claimed");
                Ok(ClaimReceipt {
                    customer_code: code.clone(),
                    amount,
                    balance,
                })
            }
            Some(Err(err)) => {
                warn!(customer = %code, amount = %amount, error = %err, "claim rejected");
                Err(err)
            }
            None => Err(ClaimError::UnknownCustomer(code.clone())),
        }
    }
}
