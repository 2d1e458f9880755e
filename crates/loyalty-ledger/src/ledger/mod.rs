//! Per-customer sales aggregates, the source of truth for point derivation.

pub mod dates;
pub mod domain;
pub mod repository;

pub use dates::normalize_date;
pub use domain::{Address, CustomerCode, NewSalesRecord, SalesRecord, UpsertOutcome};
pub use repository::{
    normalize_dates, DateNormalizationSummary, LedgerError, LedgerScan, SalesLedger,
};
