use std::collections::VecDeque;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use super::dates::normalize_date;
use super::domain::{CustomerCode, NewSalesRecord, SalesRecord, UpsertOutcome};
use crate::store::StoreError;

/// Failures raised by sales ledger implementations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("customer code must not be empty")]
    InvalidCustomerCode,
    #[error("net weight for customer {customer} must not be negative (got {weight})")]
    NegativeWeight {
        customer: CustomerCode,
        weight: Decimal,
    },
    #[error("customer {0} not found")]
    NotFound(CustomerCode),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durable store of per-customer sales aggregates keyed by customer code.
pub trait SalesLedger: Send + Sync {
    /// Insert a new customer or overwrite an existing one.
    fn upsert(&self, record: NewSalesRecord) -> Result<UpsertOutcome, LedgerError>;

    fn get(&self, code: &CustomerCode) -> Result<Option<SalesRecord>, LedgerError>;

    /// Remove a customer together with its points account.
    fn delete(&self, code: &CustomerCode) -> Result<bool, LedgerError>;

    /// Records in ascending customer-code order strictly after `after`.
    fn page(
        &self,
        after: Option<&CustomerCode>,
        limit: usize,
    ) -> Result<Vec<SalesRecord>, LedgerError>;

    /// Store `date` as the canonical purchase date, but only while the row still carries
    /// `expected_raw`. Returns `false` when the raw date was rewritten in the meantime.
    fn set_normalized_date(
        &self,
        code: &CustomerCode,
        expected_raw: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<bool, LedgerError>;

    fn list_all(&self, page_size: usize) -> LedgerScan<'_, Self>
    where
        Self: Sized,
    {
        LedgerScan::new(self, page_size)
    }
}

/// Lazy walk over every ledger row, fetched one page at a time.
pub struct LedgerScan<'a, L: ?Sized> {
    ledger: &'a L,
    page_size: usize,
    cursor: Option<CustomerCode>,
    buffer: VecDeque<SalesRecord>,
    exhausted: bool,
}

impl<'a, L> LedgerScan<'a, L>
where
    L: SalesLedger + ?Sized,
{
    pub fn new(ledger: &'a L, page_size: usize) -> Self {
        Self {
            ledger,
            page_size: page_size.max(1),
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Rewind to the first customer; rows written since the last pass are picked up.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    fn fill(&mut self) -> Result<(), LedgerError> {
        let page = self.ledger.page(self.cursor.as_ref(), self.page_size)?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.cursor = Some(last.customer_code.clone());
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl<L> Iterator for LedgerScan<'_, L>
where
    L: SalesLedger + ?Sized,
{
    type Item = Result<SalesRecord, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Counts reported by [`normalize_dates`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateNormalizationSummary {
    pub scanned: usize,
    pub normalized: usize,
    pub unparseable: usize,
    pub blank: usize,
    pub changed: usize,
}

/// Re-derive the canonical purchase date of every row from its raw string.
pub fn normalize_dates<L>(
    ledger: &L,
    page_size: usize,
) -> Result<DateNormalizationSummary, LedgerError>
where
    L: SalesLedger,
{
    let mut summary = DateNormalizationSummary::default();

    for record in ledger.list_all(page_size) {
        let record = record?;
        summary.scanned += 1;

        let parsed = match record.last_purchase_raw.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                let parsed = normalize_date(raw);
                if parsed.is_some() {
                    summary.normalized += 1;
                } else {
                    summary.unparseable += 1;
                    debug!(customer = %record.customer_code, raw, "purchase date not recognized");
                }
                parsed
            }
            _ => {
                summary.blank += 1;
                None
            }
        };

        if parsed != record.last_purchase_on {
            let expected_raw = record.last_purchase_raw.as_deref();
            match ledger.set_normalized_date(&record.customer_code, expected_raw, parsed) {
                Ok(true) => summary.changed += 1,
                // rewritten by an upsert, which already normalized the new date
                Ok(false) => {
                    debug!(customer = %record.customer_code, "purchase date superseded")
                }
                // deleted since the page was read
                Err(LedgerError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
    }

    info!(
        scanned = summary.scanned,
        normalized = summary.normalized,
        unparseable = summary.unparseable,
        changed = summary.changed,
        "purchase dates normalized"
    );

    Ok(summary)
}
