use std::sync::Arc;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{error, info};

use super::account::{IntegrityViolation, PointsAccount};
use super::repository::PointsRepository;
use crate::config::PointsConfig;
use crate::ledger::{CustomerCode, LedgerError, SalesLedger};
use crate::store::StoreError;

/// Points earned for `net_weight` grams: whole multiples of `grams_per_point`, truncated.
///
/// `None` when the quotient does not fit in a `Decimal`.
pub fn derive_points(net_weight: Decimal, grams_per_point: Decimal) -> Option<Decimal> {
    if grams_per_point <= Decimal::ZERO || net_weight <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    let mut points = net_weight
        .checked_div(grams_per_point)?
        .round_dp_with_strategy(0, RoundingStrategy::ToZero);
    // the quotient is rounded to 28 significant digits and can land on the next whole point
    while points > Decimal::ZERO
        && points
            .checked_mul(grams_per_point)
            .map_or(true, |earned| earned > net_weight)
    {
        points -= Decimal::ONE;
    }
    Some(points.normalize())
}

/// Per-customer write refused by the store during recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecomputeConflict {
    pub customer_code: String,
    pub derived_total: Decimal,
    pub claimed: Decimal,
}

impl From<IntegrityViolation> for RecomputeConflict {
    fn from(violation: IntegrityViolation) -> Self {
        Self {
            customer_code: violation.customer.to_string(),
            derived_total: violation.total,
            claimed: violation.claimed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub conflicts: Vec<RecomputeConflict>,
    /// Customers whose weight yields more points than a `Decimal` can hold.
    pub overflowed: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PointsError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Derives accrued points from the sales ledger.
pub struct PointsEngine<S> {
    store: Arc<S>,
    config: PointsConfig,
}

impl<S> PointsEngine<S>
where
    S: SalesLedger + PointsRepository,
{
    pub fn new(store: Arc<S>, config: PointsConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PointsConfig {
        &self.config
    }

    /// Overwrite every customer's total with the value derived from current net weight.
    ///
    /// Claimed points are never touched. A customer whose corrected weight would put the
    /// total below what was already claimed keeps its account unchanged and is listed in
    /// `conflicts`. A customer whose points cannot be represented is listed in
    /// `overflowed` and left untouched.
    pub fn recompute(&self) -> Result<RecomputeSummary, PointsError> {
        let mut summary = RecomputeSummary::default();

        for record in self.store.list_all(self.config.scan_page_size) {
            let record = record?;
            let code = record.customer_code;
            let Some(derived) = derive_points(record.net_weight, self.config.grams_per_point)
            else {
                error!(
                    customer = %code,
                    net_weight = %record.net_weight,
                    grams_per_point = %self.config.grams_per_point,
                    "derived points overflow, account left unchanged"
                );
                summary.overflowed.push(code.to_string());
                continue;
            };
            let now = Utc::now();

            let applied = self
                .store
                .update(&code, |account| account.set_total(derived, now))?;

            match applied {
                Some(applied) => summary.tally(&code, derived, applied),
                None => {
                    let account = PointsAccount::open(code.clone(), derived, now)?;
                    match self.store.create(account) {
                        Ok(()) => summary.created += 1,
                        // created concurrently; retry through the update path
                        Err(StoreError::Conflict(_)) => {
                            match self
                                .store
                                .update(&code, |account| account.set_total(derived, now))?
                            {
                                Some(applied) => summary.tally(&code, derived, applied),
                                // deleted again before the retry
                                None => continue,
                            }
                        }
                        // deleted since the page was read
                        Err(StoreError::MissingCustomer(_)) => continue,
                        Err(err) => return Err(err.into()),
                    }
                }
            }

            summary.processed += 1;
        }

        info!(
            processed = summary.processed,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            conflicts = summary.conflicts.len(),
            overflowed = summary.overflowed.len(),
            "points recomputed"
        );

        Ok(summary)
    }
}

impl RecomputeSummary {
    fn tally(
        &mut self,
        code: &CustomerCode,
        derived: Decimal,
        applied: Result<bool, IntegrityViolation>,
    ) {
        match applied {
            Ok(true) => self.updated += 1,
            Ok(false) => self.unchanged += 1,
            Err(violation) => {
                error!(
                    customer = %code,
                    derived = %derived,
                    claimed = %violation.claimed,
                    "derived total below claimed points, account left unchanged"
                );
                self.conflicts.push(violation.into());
            }
        }
    }
}

impl From<IntegrityViolation> for PointsError {
    fn from(violation: IntegrityViolation) -> Self {
        Self::Store(StoreError::Integrity(violation))
    }
}
