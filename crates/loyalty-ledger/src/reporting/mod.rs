//! Read-only joined view over sales records and points accounts.

pub mod views;

use std::sync::Arc;

use serde::Deserialize;

use crate::ledger::{CustomerCode, LedgerError, SalesLedger};
use crate::points::PointsRepository;
use crate::store::StoreError;

pub use views::{CustomerPointsView, PointsTotals};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filter and ordering for customer listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportingError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ReportingFacade<S> {
    store: Arc<S>,
    page_size: usize,
}

impl<S> ReportingFacade<S>
where
    S: SalesLedger + PointsRepository,
{
    pub fn new(store: Arc<S>, page_size: usize) -> Self {
        Self { store, page_size }
    }

    pub fn customer(
        &self,
        code: &CustomerCode,
    ) -> Result<Option<CustomerPointsView>, ReportingError> {
        let Some(record) = self.store.get(code)? else {
            return Ok(None);
        };
        let points = self.store.fetch(code)?.map(|account| account.balance());
        Ok(Some(CustomerPointsView::join(record, points)))
    }

    /// Customers sorted by code, optionally filtered by a code prefix.
    ///
    /// Ascending listings with a limit stop reading the ledger once the limit is reached.
    pub fn list(&self, query: &ReportQuery) -> Result<Vec<CustomerPointsView>, ReportingError> {
        let prefix = query.prefix.as_deref().map(str::trim).unwrap_or("");
        let stop_at = match query.order {
            SortOrder::Asc => query.limit,
            SortOrder::Desc => None,
        };
        let mut views = Vec::new();
        if stop_at == Some(0) {
            return Ok(views);
        }

        for record in self.store.list_all(self.page_size) {
            let record = record?;
            if !record.customer_code.as_str().starts_with(prefix) {
                continue;
            }
            let points = self
                .store
                .fetch(&record.customer_code)?
                .map(|account| account.balance());
            views.push(CustomerPointsView::join(record, points));
            if stop_at.is_some_and(|limit| views.len() >= limit) {
                break;
            }
        }

        if query.order == SortOrder::Desc {
            views.reverse();
        }
        if let Some(limit) = query.limit {
            views.truncate(limit);
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PointsConfig;
    use crate::ledger::{NewSalesRecord, SalesRecord, UpsertOutcome};
    use crate::points::{ClaimService, PointsAccount, PointsEngine};
    use chrono::NaiveDate;
    use crate::store::InMemoryLoyaltyStore;
    use rust_decimal::Decimal;

    fn populated() -> Arc<InMemoryLoyaltyStore> {
        let store = Arc::new(InMemoryLoyaltyStore::new());
        for (code, grams) in [("B-2", 45), ("A-1", 120), ("B-1", 30), ("C-7", 5)] {
            store
                .upsert(NewSalesRecord::new(code, Decimal::from(grams)))
                .expect("seed");
        }
        PointsEngine::new(store.clone(), PointsConfig::default())
            .recompute()
            .expect("recompute");
        store
    }

    #[test]
    fn customer_view_joins_points_with_sales_attributes() {
        let store = populated();
        let code = CustomerCode::parse("A-1").expect("code");
        ClaimService::new(store.clone())
            .claim(&code, Decimal::from(5))
            .expect("claim");

        let facade = ReportingFacade::new(store, 2);
        let view = facade.customer(&code).expect("query").expect("present");
        assert_eq!(view.net_weight, Decimal::from(120));
        let points = view.points.expect("account exists");
        assert_eq!(points.total, Decimal::from(12));
        assert_eq!(points.claimed, Decimal::from(5));
        assert_eq!(points.unclaimed, points.total - points.claimed);
    }

    #[test]
    fn customer_without_account_has_no_points() {
        let store = populated();
        store
            .upsert(NewSalesRecord::new("D-1", Decimal::from(80)))
            .expect("late sale");
        let facade = ReportingFacade::new(store, 2);
        let view = facade
            .customer(&CustomerCode::parse("D-1").expect("code"))
            .expect("query")
            .expect("present");
        assert!(view.points.is_none());
        assert_eq!(view.unclaimed(), Decimal::ZERO);

        let missing = facade
            .customer(&CustomerCode::parse("Z-9").expect("code"))
            .expect("query");
        assert!(missing.is_none());
    }

    #[test]
    fn list_filters_by_prefix_and_orders() {
        let facade = ReportingFacade::new(populated(), 3);

        let all = facade.list(&ReportQuery::default()).expect("list");
        let codes: Vec<_> = all.iter().map(|v| v.customer_code.as_str()).collect();
        assert_eq!(codes, vec!["A-1", "B-1", "B-2", "C-7"]);

        let query = ReportQuery {
            prefix: Some("B-".to_string()),
            order: SortOrder::Desc,
            limit: None,
        };
        let filtered = facade.list(&query).expect("list");
        let codes: Vec<_> = filtered.iter().map(|v| v.customer_code.as_str()).collect();
        assert_eq!(codes, vec!["B-2", "B-1"]);

        let limited = facade
            .list(&ReportQuery {
                limit: Some(1),
                ..ReportQuery::default()
            })
            .expect("list");
        let codes: Vec<_> = limited.iter().map(|v| v.customer_code.as_str()).collect();
        assert_eq!(codes, vec!["A-1"]);
    }

    #[test]
    fn totals_sum_points_across_views() {
        let facade = ReportingFacade::new(populated(), 10);
        let views = facade.list(&ReportQuery::default()).expect("list");
        let totals = PointsTotals::from_views(&views);
        assert_eq!(totals.customers, 4);
        assert_eq!(totals.accounts, 4);
        assert_eq!(totals.net_weight, Decimal::from(200));
        assert_eq!(totals.total, Decimal::from(19));
        assert_eq!(totals.unclaimed, Decimal::from(19));
        assert!(!totals.overflowed);
    }

    #[test]
    fn totals_pin_at_max_instead_of_overflowing() {
        let store = Arc::new(InMemoryLoyaltyStore::new());
        for code in ["H-1", "H-2"] {
            store
                .upsert(NewSalesRecord::new(code, Decimal::MAX))
                .expect("seed");
        }
        PointsEngine::new(store.clone(), PointsConfig::default())
            .recompute()
            .expect("recompute");

        let views = ReportingFacade::new(store, 10)
            .list(&ReportQuery::default())
            .expect("list");
        let totals = PointsTotals::from_views(&views);
        assert_eq!(totals.customers, 2);
        assert_eq!(totals.accounts, 2);
        assert_eq!(totals.net_weight, Decimal::MAX);
        assert!(totals.overflowed);
        assert!(totals.total < Decimal::MAX);
    }

    /// Serves the first page and fails on any later one.
    struct FirstPageOnly {
        inner: InMemoryLoyaltyStore,
    }

    impl SalesLedger for FirstPageOnly {
        fn upsert(&self, record: NewSalesRecord) -> Result<UpsertOutcome, LedgerError> {
            self.inner.upsert(record)
        }

        fn get(&self, code: &CustomerCode) -> Result<Option<SalesRecord>, LedgerError> {
            self.inner.get(code)
        }

        fn delete(&self, code: &CustomerCode) -> Result<bool, LedgerError> {
            self.inner.delete(code)
        }

        fn page(
            &self,
            after: Option<&CustomerCode>,
            limit: usize,
        ) -> Result<Vec<SalesRecord>, LedgerError> {
            match after {
                None => self.inner.page(None, limit),
                Some(_) => Err(StoreError::Unavailable("later pages".to_string()).into()),
            }
        }

        fn set_normalized_date(
            &self,
            code: &CustomerCode,
            expected_raw: Option<&str>,
            date: Option<NaiveDate>,
        ) -> Result<bool, LedgerError> {
            self.inner.set_normalized_date(code, expected_raw, date)
        }
    }

    impl PointsRepository for FirstPageOnly {
        fn fetch(&self, code: &CustomerCode) -> Result<Option<PointsAccount>, StoreError> {
            self.inner.fetch(code)
        }

        fn create(&self, account: PointsAccount) -> Result<(), StoreError> {
            self.inner.create(account)
        }

        fn update<T, F>(&self, code: &CustomerCode, apply: F) -> Result<Option<T>, StoreError>
        where
            F: FnOnce(&mut PointsAccount) -> T,
        {
            self.inner.update(code, apply)
        }
    }

    #[test]
    fn ascending_limit_stops_reading_once_filled() {
        let store = Arc::new(FirstPageOnly {
            inner: InMemoryLoyaltyStore::new(),
        });
        for code in ["A-1", "A-2", "A-3", "A-4", "A-5"] {
            store
                .upsert(NewSalesRecord::new(code, Decimal::TEN))
                .expect("seed");
        }
        let facade = ReportingFacade::new(store, 2);

        let first = facade
            .list(&ReportQuery {
                limit: Some(2),
                ..ReportQuery::default()
            })
            .expect("first page is enough");
        let codes: Vec<_> = first.iter().map(|v| v.customer_code.as_str()).collect();
        assert_eq!(codes, vec!["A-1", "A-2"]);

        assert!(facade
            .list(&ReportQuery {
                limit: Some(0),
                ..ReportQuery::default()
            })
            .expect("nothing to read")
            .is_empty());

        let descending = facade.list(&ReportQuery {
            order: SortOrder::Desc,
            limit: Some(1),
            ..ReportQuery::default()
        });
        assert!(matches!(descending, Err(ReportingError::Ledger(_))));
    }
}
