//! Bulk CSV ingestion into the sales ledger.
//!
//! Expected headers: `customer_code`, `net_weight`, and optionally `name`, `house`,
//! `street`, `place`, `postal_code`, `mobile`, `last_purchase_date`.

mod parser;

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::ledger::{LedgerError, SalesLedger, UpsertOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read sales export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid sales CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Row refused by ledger validation; the rest of the file is still imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub customer_code: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: Vec<RejectedRow>,
}

pub struct SalesCsvImporter;

impl SalesCsvImporter {
    pub fn from_path<L, P>(ledger: &L, path: P) -> Result<ImportSummary, ImportError>
    where
        L: SalesLedger + ?Sized,
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(ledger, file)
    }

    pub fn from_reader<L, R>(ledger: &L, reader: R) -> Result<ImportSummary, ImportError>
    where
        L: SalesLedger + ?Sized,
        R: Read,
    {
        let mut summary = ImportSummary::default();

        for row in parser::parse_rows(reader)? {
            let customer_code = row.record.customer_code.clone();
            match ledger.upsert(row.record) {
                Ok(UpsertOutcome::Inserted) => summary.inserted += 1,
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Err(
                    err @ (LedgerError::NegativeWeight { .. } | LedgerError::InvalidCustomerCode),
                ) => {
                    warn!(line = row.line, customer = %customer_code, error = %err, "sales row rejected");
                    summary.rejected.push(RejectedRow {
                        line: row.line,
                        customer_code,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            rejected = summary.rejected.len(),
            "sales import finished"
        );

        Ok(summary)
    }
}
