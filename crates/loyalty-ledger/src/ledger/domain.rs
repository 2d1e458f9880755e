use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::dates::normalize_date;
use super::repository::LedgerError;

/// Natural key shared by the sales ledger and the points accounts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerCode(String);

impl CustomerCode {
    /// Trims surrounding whitespace; an empty code is rejected.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidCustomerCode);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Postal address captured at the point of sale. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub house: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Row handed over by ingestion. Only the customer code and net weight are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSalesRecord {
    #[serde(default)]
    pub customer_code: String,
    pub net_weight: Decimal,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub address: Address,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub last_purchase_date: Option<String>,
}

impl NewSalesRecord {
    pub fn new(customer_code: impl Into<String>, net_weight: Decimal) -> Self {
        Self {
            customer_code: customer_code.into(),
            net_weight,
            name: None,
            address: Address::default(),
            mobile: None,
            last_purchase_date: None,
        }
    }

    /// Validate the row and stamp it for storage, keeping `created_at` of an existing row.
    pub fn into_record(
        self,
        created_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<SalesRecord, LedgerError> {
        let customer_code = CustomerCode::parse(&self.customer_code)?;
        if self.net_weight < Decimal::ZERO {
            return Err(LedgerError::NegativeWeight {
                customer: customer_code,
                weight: self.net_weight,
            });
        }

        let last_purchase_on = self.last_purchase_date.as_deref().and_then(normalize_date);

        Ok(SalesRecord {
            customer_code,
            name: self.name,
            address: self.address,
            mobile: self.mobile,
            net_weight: self.net_weight,
            last_purchase_raw: self.last_purchase_date,
            last_purchase_on,
            created_at: created_at.unwrap_or(now),
            updated_at: now,
        })
    }
}

/// Cumulative sales aggregate for one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub customer_code: CustomerCode,
    pub name: Option<String>,
    pub address: Address,
    pub mobile: Option<String>,
    /// Grams of gold purchased over the customer's lifetime.
    pub net_weight: Decimal,
    pub last_purchase_raw: Option<String>,
    pub last_purchase_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether an upsert created a new customer or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}
