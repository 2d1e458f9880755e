use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::ledger::{Address, NewSalesRecord};

/// Parsed CSV row with the source line it came from.
#[derive(Debug)]
pub(crate) struct SalesRow {
    pub(crate) line: u64,
    pub(crate) record: NewSalesRecord,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<SalesRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in csv_reader.records() {
        let raw = result?;
        let line = raw.position().map(|position| position.line()).unwrap_or_default();
        let row: CsvSalesRow = raw.deserialize(Some(&headers))?;
        rows.push(SalesRow {
            line,
            record: row.into_record(),
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct CsvSalesRow {
    customer_code: String,
    #[serde(deserialize_with = "decimal_field")]
    net_weight: Decimal,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    house: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    street: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    place: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    postal_code: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    mobile: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_purchase_date: Option<String>,
}

impl CsvSalesRow {
    fn into_record(self) -> NewSalesRecord {
        NewSalesRecord {
            customer_code: self.customer_code,
            net_weight: self.net_weight,
            name: self.name,
            address: Address {
                house: self.house,
                street: self.street,
                place: self.place,
                postal_code: self.postal_code,
            },
            mobile: self.mobile,
            last_purchase_date: self.last_purchase_date,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn decimal_field<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .parse::<Decimal>()
        .map_err(|err| serde::de::Error::custom(format!("invalid decimal '{raw}': {err}")))
}
