//! Entry point for every interface operation: checks the access policy, then delegates
//! to the ledger, points engine, claim service, or reporting facade.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::access::{AccessDenied, AccessPolicy, Caller, Operation};
use crate::config::PointsConfig;
use crate::ingest::{ImportError, ImportSummary, SalesCsvImporter};
use crate::ledger::{
    normalize_dates, CustomerCode, DateNormalizationSummary, LedgerError, NewSalesRecord,
    SalesLedger, UpsertOutcome,
};
use crate::points::{
    ClaimError, ClaimReceipt, ClaimService, PointsEngine, PointsError, PointsRepository,
    RecomputeSummary,
};
use crate::reporting::{CustomerPointsView, ReportQuery, ReportingError, ReportingFacade};

#[cfg(test)]
mod tests;

/// Service composing the store, points engine, claim service, and reporting facade.
pub struct LoyaltyService<S> {
    store: Arc<S>,
    policy: Arc<dyn AccessPolicy>,
    engine: PointsEngine<S>,
    claims: ClaimService<S>,
    reporting: ReportingFacade<S>,
    config: PointsConfig,
}

impl<S> LoyaltyService<S>
where
    S: SalesLedger + PointsRepository + 'static,
{
    pub fn new(store: Arc<S>, policy: Arc<dyn AccessPolicy>, config: PointsConfig) -> Self {
        Self {
            engine: PointsEngine::new(store.clone(), config.clone()),
            claims: ClaimService::new(store.clone()),
            reporting: ReportingFacade::new(store.clone(), config.scan_page_size),
            store,
            policy,
            config,
        }
    }

    pub fn config(&self) -> &PointsConfig {
        &self.config
    }

    fn authorize(&self, caller: &Caller, operation: Operation) -> Result<(), ServiceError> {
        self.policy.authorize(caller, operation).map_err(|denied| {
            info!(caller = %caller, operation = operation.label(), "access denied");
            ServiceError::from(denied)
        })
    }

    /// Insert or overwrite a single sales record.
    pub fn ingest(
        &self,
        caller: &Caller,
        record: NewSalesRecord,
    ) -> Result<UpsertOutcome, ServiceError> {
        self.authorize(caller, Operation::Ingest)?;
        let code = record.customer_code.clone();
        let outcome = self.store.upsert(record)?;
        debug!(caller = %caller, customer = %code, ?outcome, "sales record stored");
        Ok(outcome)
    }

    pub fn import_csv<R: Read>(
        &self,
        caller: &Caller,
        reader: R,
    ) -> Result<ImportSummary, ServiceError> {
        self.authorize(caller, Operation::Ingest)?;
        Ok(SalesCsvImporter::from_reader(self.store.as_ref(), reader)?)
    }

    pub fn import_csv_file<P: AsRef<Path>>(
        &self,
        caller: &Caller,
        path: P,
    ) -> Result<ImportSummary, ServiceError> {
        self.authorize(caller, Operation::Ingest)?;
        Ok(SalesCsvImporter::from_path(self.store.as_ref(), path)?)
    }

    /// Remove a customer and, with it, the points account.
    pub fn delete_customer(&self, caller: &Caller, code: &str) -> Result<bool, ServiceError> {
        self.authorize(caller, Operation::DeleteCustomer)?;
        let code = CustomerCode::parse(code)?;
        let existed = self.store.delete(&code)?;
        info!(caller = %caller, customer = %code, existed, "customer deleted");
        Ok(existed)
    }

    pub fn recompute(&self, caller: &Caller) -> Result<RecomputeSummary, ServiceError> {
        self.authorize(caller, Operation::Recompute)?;
        Ok(self.engine.recompute()?)
    }

    pub fn normalize_dates(
        &self,
        caller: &Caller,
    ) -> Result<DateNormalizationSummary, ServiceError> {
        self.authorize(caller, Operation::NormalizeDates)?;
        Ok(normalize_dates(self.store.as_ref(), self.config.scan_page_size)?)
    }

    pub fn claim(
        &self,
        caller: &Caller,
        code: &str,
        amount: Decimal,
    ) -> Result<ClaimReceipt, ServiceError> {
        self.authorize(caller, Operation::Claim)?;
        let code = CustomerCode::parse(code)?;
        Ok(self.claims.claim(&code, amount)?)
    }

    pub fn customer(
        &self,
        caller: &Caller,
        code: &str,
    ) -> Result<Option<CustomerPointsView>, ServiceError> {
        self.authorize(caller, Operation::Query)?;
        let code = CustomerCode::parse(code)?;
        Ok(self.reporting.customer(&code)?)
    }

    pub fn list_customers(
        &self,
        caller: &Caller,
        query: &ReportQuery,
    ) -> Result<Vec<CustomerPointsView>, ServiceError> {
        self.authorize(caller, Operation::Query)?;
        Ok(self.reporting.list(query)?)
    }
}

/// Error raised by the loyalty service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Access(#[from] AccessDenied),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Points(#[from] PointsError),
    #[error(transparent)]
    Claim(#[from] ClaimError),
    #[error(transparent)]
    Reporting(#[from] ReportingError),
}
