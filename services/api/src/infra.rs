use loyalty_ledger::access::AccessPolicy;
use loyalty_ledger::config::PointsConfig;
use loyalty_ledger::service::LoyaltyService;
use loyalty_ledger::store::InMemoryLoyaltyStore;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Claim requested on the command line as `CODE=AMOUNT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClaimArg {
    pub(crate) customer_code: String,
    pub(crate) amount: Decimal,
}

pub(crate) fn parse_claim(raw: &str) -> Result<ClaimArg, String> {
    let (code, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=AMOUNT, got '{raw}'"))?;
    let code = code.trim();
    if code.is_empty() {
        return Err(format!("missing customer code in '{raw}'"));
    }
    let amount = Decimal::from_str(amount.trim())
        .map_err(|err| format!("failed to parse '{amount}' as a points amount ({err})"))?;
    Ok(ClaimArg {
        customer_code: code.to_string(),
        amount,
    })
}

pub(crate) fn in_memory_service(
    policy: Arc<dyn AccessPolicy>,
    points: PointsConfig,
) -> LoyaltyService<InMemoryLoyaltyStore> {
    LoyaltyService::new(Arc::new(InMemoryLoyaltyStore::new()), policy, points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_and_decimal_amount() {
        let claim = parse_claim(" C-9 = 2.5 ").expect("valid claim");
        assert_eq!(claim.customer_code, "C-9");
        assert_eq!(claim.amount, Decimal::new(25, 1));
    }

    #[test]
    fn rejects_missing_parts() {
        assert!(parse_claim("C-9").is_err());
        assert!(parse_claim("=3").is_err());
        assert!(parse_claim("C-9=lots").is_err());
    }
}
