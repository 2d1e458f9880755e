use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::access::{AccessPolicy, AllowAll, ReadOnly};
use crate::config::PointsConfig;
use crate::ledger::{
    CustomerCode, LedgerError, NewSalesRecord, SalesLedger, SalesRecord, UpsertOutcome,
};
use crate::points::{PointsAccount, PointsRepository};
use crate::router::loyalty_router;
use crate::service::LoyaltyService;
use crate::store::{InMemoryLoyaltyStore, StoreError};

pub(super) fn points_config() -> PointsConfig {
    PointsConfig {
        grams_per_point: Decimal::TEN,
        scan_page_size: 2,
    }
}

pub(super) fn sale(code: &str, grams: i64, purchased: Option<&str>) -> NewSalesRecord {
    let mut record = NewSalesRecord::new(code, Decimal::from(grams));
    record.name = Some(format!("Customer {code}"));
    record.mobile = Some("9800000000".to_string());
    record.last_purchase_date = purchased.map(str::to_string);
    record
}

pub(super) fn build_service_with(
    policy: Arc<dyn AccessPolicy>,
) -> (LoyaltyService<InMemoryLoyaltyStore>, Arc<InMemoryLoyaltyStore>) {
    let store = Arc::new(InMemoryLoyaltyStore::new());
    let service = LoyaltyService::new(store.clone(), policy, points_config());
    (service, store)
}

pub(super) fn build_service() -> (LoyaltyService<InMemoryLoyaltyStore>, Arc<InMemoryLoyaltyStore>) {
    build_service_with(Arc::new(AllowAll))
}

pub(super) fn read_only_service() -> LoyaltyService<InMemoryLoyaltyStore> {
    build_service_with(Arc::new(ReadOnly)).0
}

pub(super) fn code(raw: &str) -> CustomerCode {
    CustomerCode::parse(raw).expect("valid customer code")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Store double whose backend is always offline.
pub(super) struct UnavailableStore;

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

impl SalesLedger for UnavailableStore {
    fn upsert(&self, _record: NewSalesRecord) -> Result<UpsertOutcome, LedgerError> {
        Err(offline().into())
    }

    fn get(&self, _code: &CustomerCode) -> Result<Option<SalesRecord>, LedgerError> {
        Err(offline().into())
    }

    fn delete(&self, _code: &CustomerCode) -> Result<bool, LedgerError> {
        Err(offline().into())
    }

    fn page(
        &self,
        _after: Option<&CustomerCode>,
        _limit: usize,
    ) -> Result<Vec<SalesRecord>, LedgerError> {
        Err(offline().into())
    }

    fn set_normalized_date(
        &self,
        _code: &CustomerCode,
        _expected_raw: Option<&str>,
        _date: Option<NaiveDate>,
    ) -> Result<bool, LedgerError> {
        Err(offline().into())
    }
}

impl PointsRepository for UnavailableStore {
    fn fetch(&self, _code: &CustomerCode) -> Result<Option<PointsAccount>, StoreError> {
        Err(offline())
    }

    fn create(&self, _account: PointsAccount) -> Result<(), StoreError> {
        Err(offline())
    }

    fn update<T, F>(&self, _code: &CustomerCode, _apply: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut PointsAccount) -> T,
    {
        Err(offline())
    }
}

pub(super) fn unavailable_service() -> LoyaltyService<UnavailableStore> {
    LoyaltyService::new(Arc::new(UnavailableStore), Arc::new(AllowAll), points_config())
}

pub(super) fn router_with_service<S>(service: LoyaltyService<S>) -> axum::Router
where
    S: SalesLedger + PointsRepository + 'static,
{
    loyalty_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
