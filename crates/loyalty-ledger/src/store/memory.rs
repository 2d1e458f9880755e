use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{NaiveDate, Utc};

use super::StoreError;
use crate::ledger::{
    CustomerCode, LedgerError, NewSalesRecord, SalesLedger, SalesRecord, UpsertOutcome,
};
use crate::points::{PointsAccount, PointsRepository};

/// Process-local store holding both tables behind one handle.
///
/// Locks are always taken in the order sales -> account index -> single account. Claims
/// only share the index read lock, so different customers never wait on each other.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLoyaltyStore {
    tables: Arc<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    sales: RwLock<BTreeMap<CustomerCode, SalesRecord>>,
    accounts: RwLock<HashMap<CustomerCode, Mutex<PointsAccount>>>,
}

impl InMemoryLoyaltyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer_count(&self) -> Result<usize, StoreError> {
        let sales = self
            .tables
            .sales
            .read()
            .map_err(|_| StoreError::Poisoned("sales"))?;
        Ok(sales.len())
    }

    pub fn account_count(&self) -> Result<usize, StoreError> {
        let accounts = self
            .tables
            .accounts
            .read()
            .map_err(|_| StoreError::Poisoned("accounts"))?;
        Ok(accounts.len())
    }
}

impl SalesLedger for InMemoryLoyaltyStore {
    fn upsert(&self, record: NewSalesRecord) -> Result<UpsertOutcome, LedgerError> {
        let mut sales = self
            .tables
            .sales
            .write()
            .map_err(|_| StoreError::Poisoned("sales"))?;

        let code = CustomerCode::parse(&record.customer_code)?;
        let created_at = sales.get(&code).map(|existing| existing.created_at);
        let stored = record.into_record(created_at, Utc::now())?;
        let outcome = match sales.insert(code, stored) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        };
        Ok(outcome)
    }

    fn get(&self, code: &CustomerCode) -> Result<Option<SalesRecord>, LedgerError> {
        let sales = self
            .tables
            .sales
            .read()
            .map_err(|_| StoreError::Poisoned("sales"))?;
        Ok(sales.get(code).cloned())
    }

    fn delete(&self, code: &CustomerCode) -> Result<bool, LedgerError> {
        let mut sales = self
            .tables
            .sales
            .write()
            .map_err(|_| StoreError::Poisoned("sales"))?;
        let mut accounts = self
            .tables
            .accounts
            .write()
            .map_err(|_| StoreError::Poisoned("accounts"))?;

        let existed = sales.remove(code).is_some();
        accounts.remove(code);
        Ok(existed)
    }

    fn page(
        &self,
        after: Option<&CustomerCode>,
        limit: usize,
    ) -> Result<Vec<SalesRecord>, LedgerError> {
        let sales = self
            .tables
            .sales
            .read()
            .map_err(|_| StoreError::Poisoned("sales"))?;

        let lower = match after {
            Some(code) => Bound::Excluded(code),
            None => Bound::Unbounded,
        };
        Ok(sales
            .range::<CustomerCode, _>((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn set_normalized_date(
        &self,
        code: &CustomerCode,
        expected_raw: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<bool, LedgerError> {
        let mut sales = self
            .tables
            .sales
            .write()
            .map_err(|_| StoreError::Poisoned("sales"))?;
        let record = sales
            .get_mut(code)
            .ok_or_else(|| LedgerError::NotFound(code.clone()))?;
        if record.last_purchase_raw.as_deref() != expected_raw {
            return Ok(false);
        }
        record.last_purchase_on = date;
        Ok(true)
    }
}

impl PointsRepository for InMemoryLoyaltyStore {
    fn fetch(&self, code: &CustomerCode) -> Result<Option<PointsAccount>, StoreError> {
        let accounts = self
            .tables
            .accounts
            .read()
            .map_err(|_| StoreError::Poisoned("accounts"))?;
        match accounts.get(code) {
            Some(slot) => {
                let account = slot.lock().map_err(|_| StoreError::Poisoned("account"))?;
                Ok(Some(account.clone()))
            }
            None => Ok(None),
        }
    }

    fn create(&self, account: PointsAccount) -> Result<(), StoreError> {
        account.check_invariant()?;

        let sales = self
            .tables
            .sales
            .read()
            .map_err(|_| StoreError::Poisoned("sales"))?;
        let code = account.customer_code().clone();
        if !sales.contains_key(&code) {
            return Err(StoreError::MissingCustomer(code));
        }

        let mut accounts = self
            .tables
            .accounts
            .write()
            .map_err(|_| StoreError::Poisoned("accounts"))?;
        if accounts.contains_key(&code) {
            return Err(StoreError::Conflict(code));
        }
        accounts.insert(code, Mutex::new(account));
        Ok(())
    }

    fn update<T, F>(&self, code: &CustomerCode, apply: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut PointsAccount) -> T,
    {
        let accounts = self
            .tables
            .accounts
            .read()
            .map_err(|_| StoreError::Poisoned("accounts"))?;
        let Some(slot) = accounts.get(code) else {
            return Ok(None);
        };

        let mut current = slot.lock().map_err(|_| StoreError::Poisoned("account"))?;
        let mut draft = current.clone();
        let output = apply(&mut draft);
        draft.check_invariant()?;
        *current = draft;
        Ok(Some(output))
    }
}
