use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::access::Caller;
use crate::ingest::ImportError;
use crate::ledger::{LedgerError, NewSalesRecord, SalesLedger, UpsertOutcome};
use crate::points::{ClaimError, ClaimOutcome, ClaimReceipt, PointsRepository};
use crate::reporting::ReportQuery;
use crate::service::{LoyaltyService, ServiceError};

/// Header carrying the caller identity forwarded by the fronting platform.
pub const CALLER_HEADER: &str = "x-caller-id";

/// Router builder exposing ingestion, batch, claim, and query endpoints.
pub fn loyalty_router<S>(service: Arc<LoyaltyService<S>>) -> Router
where
    S: SalesLedger + PointsRepository + 'static,
{
    Router::new()
        .route("/api/v1/customers", get(list_handler::<S>))
        .route(
            "/api/v1/customers/:customer_code",
            get(customer_handler::<S>)
                .put(upsert_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .route(
            "/api/v1/customers/:customer_code/claims",
            post(claim_handler::<S>),
        )
        .route("/api/v1/import", post(import_handler::<S>))
        .route("/api/v1/batch/recompute", post(recompute_handler::<S>))
        .route(
            "/api/v1/batch/normalize-dates",
            post(normalize_dates_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub amount: Decimal,
}

fn caller_from(headers: &HeaderMap) -> Caller {
    headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| Caller(value.to_string()))
        .unwrap_or_else(Caller::anonymous)
}

pub(crate) async fn upsert_handler<S>(
    State(service): State<Arc<LoyaltyService<S>>>,
    Path(customer_code): Path<String>,
    headers: HeaderMap,
    Json(mut record): Json<NewSalesRecord>,
) -> Response
where
    S: SalesLedger + PointsRepository + 'static,
{
    record.customer_code = customer_code;
    match service.ingest(&caller_from(&headers), record) {
        Ok(UpsertOutcome::Inserted) => {
            (StatusCode::CREATED, Json(json!({ "outcome": "inserted" }))).into_response()
        }
        Ok(UpsertOutcome::Updated) => {
            (StatusCode::OK, Json(json!({ "outcome": "updated" }))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn customer_handler<S>(
    State(service): State<Arc<LoyaltyService<S>>>,
    Path(customer_code): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: SalesLedger + PointsRepository + 'static,
{
    match service.customer(&caller_from(&headers), &customer_code) {
        Ok(Some(view)) => (StatusCode::OK, Json(view)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": format!("customer {customer_code} not found"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<LoyaltyService<S>>>,
    Path(customer_code): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: SalesLedger + PointsRepository + 'static,
{
    match service.delete_customer(&caller_from(&headers), &customer_code) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => {
            let payload = json!({
                "error": format!("customer {customer_code} not found"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<LoyaltyService<S>>>,
    Query(query): Query<ReportQuery>,
    headers: HeaderMap,
) -> Response
where
    S: SalesLedger + PointsRepository + 'static,
{
    match service.list_customers(&caller_from(&headers), &query) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn claim_handler<S>(
    State(service): State<Arc<LoyaltyService<S>>>,
    Path(customer_code): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ClaimRequest>,
) -> Response
where
    S: SalesLedger + PointsRepository + 'static,
{
    match service.claim(&caller_from(&headers), &customer_code, request.amount) {
        Ok(receipt) => claim_outcome_response(Ok(receipt)),
        Err(ServiceError::Claim(err)) => claim_outcome_response(Err(err)),
        Err(err) => err.into_response(),
    }
}

fn claim_outcome_response(result: Result<ClaimReceipt, ClaimError>) -> Response {
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(ClaimError::InvalidAmount(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        Err(ClaimError::UnknownCustomer(_)) => StatusCode::NOT_FOUND,
        Err(ClaimError::InsufficientPoints { .. }) => StatusCode::CONFLICT,
        Err(ClaimError::Integrity(_) | ClaimError::Store(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    match ClaimOutcome::from_result(result) {
        Ok(outcome) => (status, Json(outcome)).into_response(),
        Err(err) => ServiceError::Claim(err).into_response(),
    }
}

pub(crate) async fn import_handler<S>(
    State(service): State<Arc<LoyaltyService<S>>>,
    headers: HeaderMap,
    body: String,
) -> Response
where
    S: SalesLedger + PointsRepository + 'static,
{
    match service.import_csv(&caller_from(&headers), body.as_bytes()) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn recompute_handler<S>(
    State(service): State<Arc<LoyaltyService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: SalesLedger + PointsRepository + 'static,
{
    match service.recompute(&caller_from(&headers)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn normalize_dates_handler<S>(
    State(service): State<Arc<LoyaltyService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: SalesLedger + PointsRepository + 'static,
{
    match service.normalize_dates(&caller_from(&headers)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Access(_) => StatusCode::FORBIDDEN,
            ServiceError::Ledger(err) | ServiceError::Import(ImportError::Ledger(err)) => {
                ledger_status(err)
            }
            ServiceError::Import(ImportError::Csv(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Import(ImportError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Claim(ClaimError::InvalidAmount(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Claim(ClaimError::UnknownCustomer(_)) => StatusCode::NOT_FOUND,
            ServiceError::Claim(ClaimError::InsufficientPoints { .. }) => StatusCode::CONFLICT,
            ServiceError::Claim(ClaimError::Integrity(_) | ClaimError::Store(_))
            | ServiceError::Points(_)
            | ServiceError::Reporting(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidCustomerCode | LedgerError::NegativeWeight { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let payload = json!({ "error": self.to_string() });
        (status, Json(payload)).into_response()
    }
}
