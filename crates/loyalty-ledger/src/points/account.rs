use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::CustomerCode;

/// Raised whenever a write would leave `claimed` above `total` or either value negative.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("points invariant violated for customer {customer}: claimed {claimed} / total {total}")]
pub struct IntegrityViolation {
    pub customer: CustomerCode,
    pub total: Decimal,
    pub claimed: Decimal,
}

/// Accrued and claimed points for one customer.
///
/// Fields stay private so that `0 <= claimed <= total` holds for every value of this type;
/// unclaimed points are always derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsAccount {
    customer_code: CustomerCode,
    total: Decimal,
    claimed: Decimal,
    updated_at: DateTime<Utc>,
}

impl PointsAccount {
    /// Fresh account with nothing claimed.
    pub fn open(
        customer_code: CustomerCode,
        total: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, IntegrityViolation> {
        Self::restore(customer_code, total, Decimal::ZERO, now)
    }

    /// Rebuild an account from stored values, re-checking the invariant.
    pub fn restore(
        customer_code: CustomerCode,
        total: Decimal,
        claimed: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, IntegrityViolation> {
        let account = Self {
            customer_code,
            total,
            claimed,
            updated_at,
        };
        account.check_invariant()?;
        Ok(account)
    }

    pub fn customer_code(&self) -> &CustomerCode {
        &self.customer_code
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn claimed(&self) -> Decimal {
        self.claimed
    }

    pub fn unclaimed(&self) -> Decimal {
        self.total - self.claimed
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn balance(&self) -> PointsBalance {
        PointsBalance {
            total: self.total,
            claimed: self.claimed,
            unclaimed: self.unclaimed(),
            updated_at: self.updated_at,
        }
    }

    pub fn check_invariant(&self) -> Result<(), IntegrityViolation> {
        if self.claimed < Decimal::ZERO || self.claimed > self.total {
            return Err(self.violation(self.total, self.claimed));
        }
        Ok(())
    }

    /// Overwrite the accrued total. Returns whether the value changed.
    pub fn set_total(
        &mut self,
        total: Decimal,
        now: DateTime<Utc>,
    ) -> Result<bool, IntegrityViolation> {
        if total < Decimal::ZERO || self.claimed > total {
            return Err(self.violation(total, self.claimed));
        }
        if total == self.total {
            return Ok(false);
        }
        self.total = total;
        self.updated_at = now;
        Ok(true)
    }

    /// Move `amount` from unclaimed to claimed.
    pub fn record_claim(
        &mut self,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), IntegrityViolation> {
        let claimed = self.claimed + amount;
        if amount < Decimal::ZERO || claimed > self.total {
            return Err(self.violation(self.total, claimed));
        }
        self.claimed = claimed;
        self.updated_at = now;
        Ok(())
    }

    fn violation(&self, total: Decimal, claimed: Decimal) -> IntegrityViolation {
        IntegrityViolation {
            customer: self.customer_code.clone(),
            total,
            claimed,
        }
    }
}

/// Consistent snapshot of an account, with unclaimed computed from the same read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsBalance {
    pub total: Decimal,
    pub claimed: Decimal,
    pub unclaimed: Decimal,
    pub updated_at: DateTime<Utc>,
}
