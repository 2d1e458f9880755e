use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::{Address, CustomerCode, SalesRecord};
use crate::points::PointsBalance;

/// Sales attributes joined with the customer's points, if an account exists yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerPointsView {
    pub customer_code: CustomerCode,
    pub name: Option<String>,
    pub address: Address,
    pub mobile: Option<String>,
    pub net_weight: Decimal,
    pub last_purchase_raw: Option<String>,
    pub last_purchase_on: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
    pub points: Option<PointsBalance>,
}

impl CustomerPointsView {
    pub fn join(record: SalesRecord, points: Option<PointsBalance>) -> Self {
        Self {
            customer_code: record.customer_code,
            name: record.name,
            address: record.address,
            mobile: record.mobile,
            net_weight: record.net_weight,
            last_purchase_raw: record.last_purchase_raw,
            last_purchase_on: record.last_purchase_on,
            updated_at: record.updated_at,
            points,
        }
    }

    pub fn unclaimed(&self) -> Decimal {
        self.points
            .map(|balance| balance.unclaimed)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Programme-wide sums over a set of views.
///
/// A sum that would exceed `Decimal::MAX` is pinned there and `overflowed` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PointsTotals {
    pub customers: usize,
    pub accounts: usize,
    pub net_weight: Decimal,
    pub total: Decimal,
    pub claimed: Decimal,
    pub unclaimed: Decimal,
    pub overflowed: bool,
}

impl PointsTotals {
    pub fn from_views<'a>(views: impl IntoIterator<Item = &'a CustomerPointsView>) -> Self {
        views
            .into_iter()
            .fold(Self::default(), |mut totals, view| {
                totals.customers += 1;
                totals.net_weight = totals.add(totals.net_weight, view.net_weight);
                if let Some(balance) = view.points {
                    totals.accounts += 1;
                    totals.total = totals.add(totals.total, balance.total);
                    totals.claimed = totals.add(totals.claimed, balance.claimed);
                    totals.unclaimed = totals.add(totals.unclaimed, balance.unclaimed);
                }
                totals
            })
    }

    fn add(&mut self, sum: Decimal, value: Decimal) -> Decimal {
        sum.checked_add(value).unwrap_or_else(|| {
            self.overflowed = true;
            Decimal::MAX
        })
    }
}
